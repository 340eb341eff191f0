use chrono::Utc;
use sea_orm::Database;

use engine::{
    CategoryScope, CreateGroupCmd, CreateTransactionCmd, Currency, Engine, ErrorKind, GroupRole,
    Money, Polarity, UpdateTransactionCmd, WalletOwner,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .password_cost(4)
        .build()
        .await
        .unwrap()
}

async fn register(engine: &Engine, username: &str) -> Uuid {
    engine
        .register_user(username, &format!("{username}@example.com"), "secret")
        .await
        .unwrap()
        .0
        .id
}

#[tokio::test]
async fn group_wallet_follows_membership() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;
    let carol = register(&engine, "carol").await;

    let (group, wallet) = engine
        .create_group(CreateGroupCmd::new(alice, "Flat").members([bob, bob, alice]))
        .await
        .unwrap();
    assert_eq!(wallet.name, "Wallet Flat");
    assert_eq!(wallet.owner, WalletOwner::Group(group.id));
    assert_eq!(wallet.balance, Money::ZERO);

    let members = engine.group_members(bob, group.id).await.unwrap();
    let roles: Vec<(String, GroupRole)> = members
        .into_iter()
        .map(|member| (member.username, member.role))
        .collect();
    assert_eq!(
        roles,
        vec![
            ("alice".to_string(), GroupRole::Admin),
            ("bob".to_string(), GroupRole::Member),
        ]
    );

    engine
        .create_transaction(CreateTransactionCmd::new(
            bob,
            wallet.id,
            "Groceries",
            "Weekly shop",
            3_000,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert!(engine.authorize_wallet(bob, wallet.id).await.is_ok());

    let err = engine.authorize_wallet(carol, wallet.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    engine
        .add_group_member(alice, group.id, carol, GroupRole::Member)
        .await
        .unwrap();
    assert!(engine.authorize_wallet(carol, wallet.id).await.is_ok());
    assert!(
        engine
            .list_wallets(carol)
            .await
            .unwrap()
            .iter()
            .any(|w| w.id == wallet.id)
    );

    engine
        .remove_group_member(alice, group.id, bob)
        .await
        .unwrap();
    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            bob,
            wallet.id,
            "Groceries",
            "Snacks",
            500,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(
        engine.wallet(alice, wallet.id).await.unwrap().balance,
        Money::new(-3_000)
    );
}

#[tokio::test]
async fn group_members_cannot_change_each_others_records() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;
    let (_, wallet) = engine
        .create_group(CreateGroupCmd::new(alice, "Flat").member(bob))
        .await
        .unwrap();

    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            alice,
            wallet.id,
            "Utilities",
            "Electricity",
            2_500,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert!(engine.authorize_wallet(bob, wallet.id).await.is_ok());

    let err = engine
        .update_transaction(UpdateTransactionCmd::new(bob, tx.id).amount_minor(10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = engine
        .delete_transaction(bob, tx.id, wallet.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = engine.transaction(bob, tx.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    assert_eq!(
        engine.transaction(alice, tx.id).await.unwrap().amount,
        Money::new(-2_500)
    );
    assert_eq!(
        engine.wallet(bob, wallet.id).await.unwrap().balance,
        Money::new(-2_500)
    );
}

#[tokio::test]
async fn only_admins_manage_members() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;
    let carol = register(&engine, "carol").await;
    let (group, _) = engine
        .create_group(CreateGroupCmd::new(alice, "Trip").member(bob))
        .await
        .unwrap();

    let err = engine
        .add_group_member(bob, group.id, carol, GroupRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = engine
        .add_group_member(alice, group.id, bob, GroupRole::Guest)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = engine
        .remove_group_member(alice, group.id, alice)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = engine
        .remove_group_member(alice, group.id, carol)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine.group_members(carol, group.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = engine
        .group_members(alice, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn category_names_resolve_by_scope() {
    let engine = engine_with_db().await;
    let (alice_user, wallet) = engine
        .register_user("alice", "alice@example.com", "secret")
        .await
        .unwrap();
    let alice = alice_user.id;
    let bob = register(&engine, "bob").await;

    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            alice,
            wallet.id,
            "  payment-RECEIVED ",
            "Invoice",
            1_500,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(tx.category.name, "Payment Received");
    assert_eq!(tx.category.scope, CategoryScope::Global);
    assert_eq!(tx.amount, Money::new(1_500));

    let own = engine
        .create_category(alice, "Food", Polarity::Income, None)
        .await
        .unwrap();
    assert_eq!(own.scope, CategoryScope::User(alice));
    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            alice,
            wallet.id,
            "food",
            "Sold leftovers",
            100,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(tx.category.id, own.id);
    assert_eq!(tx.amount, Money::new(100));

    let err = engine
        .create_category(alice, "FOOD", Polarity::Expense, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let secret = engine
        .create_category(bob, "Hobby", Polarity::Expense, None)
        .await
        .unwrap();
    for reference in [secret.id.to_string(), "Hobby".to_string()] {
        let err = engine
            .create_transaction(CreateTransactionCmd::new(
                alice,
                wallet.id,
                reference,
                "Paint",
                100,
                Utc::now(),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    let visible = engine.list_categories(alice).await.unwrap();
    assert!(visible.iter().any(|c| c.id == own.id));
    assert!(visible.iter().all(|c| c.id != secret.id));
    assert!(visible.iter().any(|c| c.scope == CategoryScope::Global));
}

#[tokio::test]
async fn group_categories_need_membership() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;
    let carol = register(&engine, "carol").await;
    let (group, wallet) = engine
        .create_group(CreateGroupCmd::new(alice, "Band").member(bob))
        .await
        .unwrap();

    let err = engine
        .create_category(carol, "Gear", Polarity::Expense, Some(group.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let gear = engine
        .create_category(alice, "Gear", Polarity::Expense, Some(group.id))
        .await
        .unwrap();
    assert_eq!(gear.scope, CategoryScope::Group(group.id));

    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            bob,
            wallet.id,
            "gear",
            "Strings",
            900,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(tx.category.id, gear.id);
    assert_eq!(tx.amount, Money::new(-900));
}

#[tokio::test]
async fn credentials_and_duplicates() {
    let engine = engine_with_db().await;
    let (alice, _) = engine
        .register_user("alice", "Alice@Example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(alice.email, "alice@example.com");

    let user = engine
        .verify_credentials("ALICE@example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(user.id, alice.id);

    let wrong_password = engine
        .verify_credentials("alice@example.com", "hunter3")
        .await
        .unwrap_err();
    let unknown_email = engine
        .verify_credentials("nobody@example.com", "hunter2")
        .await
        .unwrap_err();
    assert_eq!(wrong_password.kind(), ErrorKind::Authorization);
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());

    let err = engine
        .register_user("alice", "other@example.com", "pw")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = engine
        .register_user("alice2", "alice@EXAMPLE.com", "pw")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = engine
        .register_user("bob", "not-an-email", "pw")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(engine.user_profile(alice.id).await.unwrap().username, "alice");
    assert_eq!(engine.user_by_username("alice").await.unwrap().id, alice.id);
    let err = engine.user_by_username("ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn categories_are_renamed_by_their_owner_only() {
    let engine = engine_with_db().await;
    let (alice_user, wallet) = engine
        .register_user("alice", "alice@example.com", "secret")
        .await
        .unwrap();
    let alice = alice_user.id;
    let bob = register(&engine, "bob").await;

    let hobby = engine
        .create_category(alice, "Hobby", Polarity::Expense, None)
        .await
        .unwrap();
    engine
        .create_category(alice, "Books", Polarity::Expense, None)
        .await
        .unwrap();

    let renamed = engine
        .rename_category(alice, hobby.id, "  Crafts ")
        .await
        .unwrap();
    assert_eq!(renamed.id, hobby.id);
    assert_eq!(renamed.name, "Crafts");
    assert_eq!(renamed.polarity, Polarity::Expense);
    assert_eq!(renamed.scope, CategoryScope::User(alice));

    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            alice,
            wallet.id,
            "crafts",
            "Yarn",
            300,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(tx.category.id, hobby.id);
    assert_eq!(tx.amount, Money::new(-300));

    let same = engine
        .rename_category(alice, hobby.id, "CRAFTS")
        .await
        .unwrap();
    assert_eq!(same.name, "CRAFTS");

    let err = engine
        .rename_category(alice, hobby.id, "books")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = engine
        .rename_category(bob, hobby.id, "Mine")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let global = engine
        .list_categories(alice)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.scope == CategoryScope::Global)
        .unwrap();
    let err = engine
        .rename_category(alice, global.id, "Anything")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = engine
        .rename_category(alice, hobby.id, "   ")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn categories_in_use_cannot_be_deleted() {
    let engine = engine_with_db().await;
    let (alice_user, wallet) = engine
        .register_user("alice", "alice@example.com", "secret")
        .await
        .unwrap();
    let alice = alice_user.id;
    let bob = register(&engine, "bob").await;

    let unused = engine
        .create_category(alice, "Unused", Polarity::Income, None)
        .await
        .unwrap();
    let used = engine
        .create_category(alice, "Side gig", Polarity::Income, None)
        .await
        .unwrap();
    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            alice,
            wallet.id,
            used.id.to_string(),
            "Logo design",
            800,
            Utc::now(),
        ))
        .await
        .unwrap();

    let err = engine.delete_category(bob, unused.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    engine.delete_category(alice, unused.id).await.unwrap();
    assert!(
        engine
            .list_categories(alice)
            .await
            .unwrap()
            .iter()
            .all(|c| c.id != unused.id)
    );
    let err = engine.delete_category(alice, unused.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine.delete_category(alice, used.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    engine
        .delete_transaction(alice, tx.id, wallet.id)
        .await
        .unwrap();
    let err = engine.delete_category(alice, used.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        engine.wallet(alice, wallet.id).await.unwrap().balance,
        Money::ZERO
    );
}

#[tokio::test]
async fn group_categories_are_managed_by_admins() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;
    let carol = register(&engine, "carol").await;
    let (group, _) = engine
        .create_group(CreateGroupCmd::new(alice, "Band").member(bob))
        .await
        .unwrap();
    let gear = engine
        .create_category(bob, "Gear", Polarity::Expense, Some(group.id))
        .await
        .unwrap();

    let err = engine
        .rename_category(bob, gear.id, "Equipment")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = engine.delete_category(bob, gear.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = engine
        .rename_category(carol, gear.id, "Equipment")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let renamed = engine
        .rename_category(alice, gear.id, "Equipment")
        .await
        .unwrap();
    assert_eq!(renamed.scope, CategoryScope::Group(group.id));
    engine.delete_category(alice, gear.id).await.unwrap();
}

#[tokio::test]
async fn groups_are_listed_for_members() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;
    let carol = register(&engine, "carol").await;

    let (trip, trip_wallet) = engine
        .create_group(
            CreateGroupCmd::new(alice, "Trip")
                .description("Bali")
                .member(bob),
        )
        .await
        .unwrap();
    let (flat, _) = engine
        .create_group(CreateGroupCmd::new(alice, "Flat"))
        .await
        .unwrap();

    let listed = engine.list_groups(alice).await.unwrap();
    let names: Vec<(&str, u64)> = listed
        .iter()
        .map(|overview| (overview.group.name.as_str(), overview.member_count))
        .collect();
    assert_eq!(names, vec![("Flat", 1), ("Trip", 2)]);
    assert_eq!(listed[1].wallet.id, trip_wallet.id);

    let listed = engine.list_groups(bob).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].group.id, trip.id);
    assert!(engine.list_groups(carol).await.unwrap().is_empty());

    let detail = engine.group(bob, trip.id).await.unwrap();
    assert_eq!(detail.group.description.as_deref(), Some("Bali"));
    assert_eq!(detail.group.owner_id, alice);
    assert_eq!(detail.wallet.owner, WalletOwner::Group(trip.id));
    let members: Vec<&str> = detail
        .members
        .iter()
        .map(|member| member.username.as_str())
        .collect();
    assert_eq!(members, vec!["alice", "bob"]);

    let err = engine.group(bob, flat.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = engine.group(alice, Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn users_are_listed_by_name() {
    let engine = engine_with_db().await;
    let carol = register(&engine, "carol").await;
    register(&engine, "alice").await;
    register(&engine, "bob").await;

    let users = engine.list_users(carol).await.unwrap();
    let names: Vec<&str> = users.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);

    let err = engine.list_users(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn extra_wallets_keep_their_currency() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;

    let travel = engine
        .create_wallet(alice, " Travel ", Currency::Eur)
        .await
        .unwrap();
    assert_eq!(travel.name, "Travel");
    assert_eq!(travel.currency, Currency::Eur);
    assert_eq!(travel.balance, Money::ZERO);
    assert_eq!(travel.owner, WalletOwner::Personal(alice));

    engine
        .create_transaction(CreateTransactionCmd::new(
            alice,
            travel.id,
            "Transport",
            "Train",
            4_550,
            Utc::now(),
        ))
        .await
        .unwrap();
    let stored = engine.wallet(alice, travel.id).await.unwrap();
    assert_eq!(stored.currency, Currency::Eur);
    assert_eq!(stored.balance, Money::new(-4_550));

    let wallets = engine.list_wallets(alice).await.unwrap();
    assert_eq!(wallets.len(), 2);

    let err = engine.wallet(bob, travel.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = engine
        .create_wallet(alice, "", Currency::Usd)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
