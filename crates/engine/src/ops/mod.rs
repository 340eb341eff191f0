use sea_orm::DatabaseConnection;

use crate::{ResultEngine, password::PasswordHash};

mod access;
mod categories;
mod groups;
mod ledger;
mod transactions;
mod users;
mod wallets;

pub use transactions::TransactionListFilter;
pub use wallets::RecomputedBalance;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// Storage failures escaping the block are labeled with `$context`.
macro_rules! with_tx {
    ($self:expr, $context:expr, |$tx:ident| $body:expr) => {{
        let result = async {
            let $tx = $self.database.begin().await?;
            let value = {
                let inner: crate::ResultEngine<_> = $body;
                inner
            }?;
            $tx.commit().await?;
            Ok::<_, crate::EngineError>(value)
        }
        .await;
        result.map_err(|err| err.context($context))
    }};
}

pub(crate) use with_tx;

/// Entry point for every operation.
///
/// The engine holds no mutable state: all shared state lives in the database,
/// so one `Engine` can serve concurrent callers.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    password_cost: u32,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    password_cost: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            password_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// bcrypt cost used when registering users.
    pub fn password_cost(mut self, cost: u32) -> EngineBuilder {
        self.password_cost = cost;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            password_cost: self.password_cost,
        })
    }
}
