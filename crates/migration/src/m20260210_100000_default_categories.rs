//! Seeds the global default categories.

use sea_orm::{ConnectionTrait, Statement};
use sea_orm_migration::prelude::*;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
    NameNorm,
    Polarity,
    UserId,
    GroupId,
}

const INCOME: &[&str] = &["Salary", "Freelance", "Payment Received", "Gift"];

const EXPENSE: &[&str] = &[
    "Groceries",
    "Food",
    "Clothing",
    "Debt",
    "Subscription",
    "Utilities",
    "Transport",
    "Entertainment",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        let defaults = INCOME
            .iter()
            .map(|name| (*name, "INCOME"))
            .chain(EXPENSE.iter().map(|name| (*name, "EXPENSE")));

        for (name, polarity) in defaults {
            let stmt = Query::insert()
                .into_table(Categories::Table)
                .columns([
                    Categories::Id,
                    Categories::Name,
                    Categories::NameNorm,
                    Categories::Polarity,
                    Categories::UserId,
                    Categories::GroupId,
                ])
                .values_panic([
                    Uuid::new_v4().into(),
                    name.into(),
                    normalize_key(name).into(),
                    polarity.into(),
                    Option::<Uuid>::None.into(),
                    Option::<Uuid>::None.into(),
                ])
                .to_owned();
            db.execute(backend.build(&stmt)).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "DELETE FROM categories WHERE user_id IS NULL AND group_id IS NULL;".to_string(),
        ))
        .await?;
        Ok(())
    }
}

fn normalize_key(input: &str) -> String {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    out.trim_end().to_string()
}
