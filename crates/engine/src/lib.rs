//! Transaction and balance engine.
//!
//! The [`Engine`] records income and expense transactions against wallets and
//! keeps every wallet's cached balance equal to the signed sum of its
//! non-deleted transactions. Each write runs as one database transaction that
//! touches both the transaction row and the wallet balance.

pub use categories::{Category, CategoryScope, Polarity};
pub use commands::{CreateGroupCmd, CreateTransactionCmd, UpdateTransactionCmd};
pub use currency::Currency;
pub use error::{EngineError, ErrorKind};
pub use group_memberships::{GroupMember, GroupRole};
pub use groups::{Group, GroupDetail, GroupOverview};
pub use money::Money;
pub use ops::{Engine, EngineBuilder, RecomputedBalance, TransactionListFilter};
pub use transactions::Transaction;
pub use users::{User, UserRole};
pub use wallets::{Wallet, WalletOwner};

mod categories;
mod commands;
mod currency;
mod error;
mod group_memberships;
mod groups;
mod money;
mod ops;
mod password;
mod transactions;
mod users;
mod util;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
