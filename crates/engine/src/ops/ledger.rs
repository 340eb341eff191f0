//! Storage primitives used by the transaction writes.
//!
//! Every function takes the open `DatabaseTransaction`, so a write and its
//! balance adjustment commit or roll back together. Conditional updates turn
//! lost races into `Conflict` instead of silently applying twice.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseTransaction, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, transactions, wallets};

/// Field changes for [`Engine::save_transaction`]. `None` keeps the stored value.
#[derive(Debug, Default)]
pub(super) struct TransactionChanges {
    pub(super) title: Option<String>,
    pub(super) amount_minor: Option<i64>,
    pub(super) description: Option<String>,
    pub(super) occurred_at: Option<DateTime<Utc>>,
}

impl TransactionChanges {
    pub(super) fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.amount_minor.is_none()
            && self.description.is_none()
            && self.occurred_at.is_none()
    }
}

impl super::Engine {
    pub(super) async fn find_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
    ) -> ResultEngine<wallets::Model> {
        wallets::Entity::find_by_id(wallet_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))
    }

    /// Loads a transaction that has not been soft deleted.
    pub(super) async fn find_active_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::DeletedAt.is_null())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// Loads a transaction whether or not it has been soft deleted.
    pub(super) async fn find_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    pub(super) async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        model: transactions::ActiveModel,
    ) -> ResultEngine<transactions::Model> {
        Ok(model.insert(db_tx).await?)
    }

    /// Persists `changes` on an active transaction.
    ///
    /// The row is only touched if it still holds `expected_amount_minor` and
    /// is not deleted; otherwise another writer got there first.
    pub(super) async fn save_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        expected_amount_minor: i64,
        changes: TransactionChanges,
        updated_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let mut update = transactions::Entity::update_many()
            .col_expr(transactions::Column::UpdatedAt, Expr::value(updated_at))
            .filter(transactions::Column::Id.eq(transaction_id))
            .filter(transactions::Column::AmountMinor.eq(expected_amount_minor))
            .filter(transactions::Column::DeletedAt.is_null());
        if let Some(title) = changes.title {
            update = update.col_expr(transactions::Column::Title, Expr::value(title));
        }
        if let Some(amount_minor) = changes.amount_minor {
            update = update.col_expr(transactions::Column::AmountMinor, Expr::value(amount_minor));
        }
        if let Some(description) = changes.description {
            update = update.col_expr(
                transactions::Column::Description,
                Expr::value(Some(description)),
            );
        }
        if let Some(occurred_at) = changes.occurred_at {
            update = update.col_expr(transactions::Column::OccurredAt, Expr::value(occurred_at));
        }

        let result = update.exec(db_tx).await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(
                "transaction changed concurrently".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the tombstone on an active transaction.
    ///
    /// A transaction that is already deleted yields `Conflict`, so a racing
    /// second delete can never reverse the amount twice.
    pub(super) async fn mark_deleted(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let result = transactions::Entity::update_many()
            .col_expr(transactions::Column::DeletedAt, Expr::value(Some(deleted_at)))
            .col_expr(transactions::Column::UpdatedAt, Expr::value(deleted_at))
            .filter(transactions::Column::Id.eq(transaction_id))
            .filter(transactions::Column::DeletedAt.is_null())
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(
                "transaction already deleted".to_string(),
            ));
        }
        Ok(())
    }

    /// `balance = balance + delta_minor`, evaluated by the database.
    pub(super) async fn adjust_wallet_balance(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        delta_minor: i64,
    ) -> ResultEngine<()> {
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(delta_minor),
            )
            .filter(wallets::Column::Id.eq(wallet_id))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("wallet not exists".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use migration::MigratorTrait;
    use sea_orm::{Database, TransactionTrait};

    use super::*;
    use crate::{CreateTransactionCmd, Engine};

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

    async fn recorded(engine: &Engine) -> (Uuid, Uuid) {
        let (user, wallet) = engine
            .register_user("alice", "alice@example.com", "secret")
            .await
            .unwrap();
        let tx = engine
            .create_transaction(CreateTransactionCmd::new(
                user.id,
                wallet.id,
                "Salary",
                "February",
                500,
                Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap(),
            ))
            .await
            .unwrap();
        (tx.id, wallet.id)
    }

    #[tokio::test]
    async fn stale_amount_is_a_conflict() {
        let engine = engine_with_db().await;
        let (tx_id, _) = recorded(&engine).await;

        let db_tx = engine.database.begin().await.unwrap();
        let changes = TransactionChanges {
            amount_minor: Some(300),
            ..Default::default()
        };
        let err = engine
            .save_transaction(&db_tx, tx_id, 400, changes, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Conflict("transaction changed concurrently".to_string())
        );

        let stored = engine.find_active_transaction(&db_tx, tx_id).await.unwrap();
        assert_eq!(stored.amount_minor, 500);

        let changes = TransactionChanges {
            amount_minor: Some(300),
            ..Default::default()
        };
        engine
            .save_transaction(&db_tx, tx_id, 500, changes, Utc::now())
            .await
            .unwrap();
        let stored = engine.find_active_transaction(&db_tx, tx_id).await.unwrap();
        assert_eq!(stored.amount_minor, 300);
    }

    #[tokio::test]
    async fn deleted_rows_reject_changes() {
        let engine = engine_with_db().await;
        let (tx_id, wallet_id) = recorded(&engine).await;

        let db_tx = engine.database.begin().await.unwrap();
        engine.mark_deleted(&db_tx, tx_id, Utc::now()).await.unwrap();

        let err = engine
            .mark_deleted(&db_tx, tx_id, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Conflict("transaction already deleted".to_string())
        );

        let changes = TransactionChanges {
            title: Some("late edit".to_string()),
            ..Default::default()
        };
        let err = engine
            .save_transaction(&db_tx, tx_id, 500, changes, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let err = engine
            .adjust_wallet_balance(&db_tx, Uuid::new_v4(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(_)));
        assert!(engine.find_wallet(&db_tx, wallet_id).await.is_ok());
    }
}
