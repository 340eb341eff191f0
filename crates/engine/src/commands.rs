//! Command structs for engine operations.
//!
//! These types group parameters for transaction writes, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Record a new transaction against a wallet.
///
/// `category` is either a category id or a category name. `amount_minor` is a
/// magnitude: its sign is ignored and replaced by the category polarity.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub category: String,
    pub title: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: Uuid,
        wallet_id: Uuid,
        category: impl Into<String>,
        title: impl Into<String>,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            wallet_id,
            category: category.into(),
            title: title.into(),
            amount_minor,
            description: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Patch an existing transaction.
///
/// Omitted fields are left unchanged. Blank text and a zero amount count as
/// omitted.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub user_id: Uuid,
    pub transaction_id: Uuid,
    pub title: Option<String>,
    pub amount_minor: Option<i64>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(user_id: Uuid, transaction_id: Uuid) -> Self {
        Self {
            user_id,
            transaction_id,
            title: None,
            amount_minor: None,
            description: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Create a group together with its shared wallet.
#[derive(Clone, Debug)]
pub struct CreateGroupCmd {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub member_ids: Vec<Uuid>,
}

impl CreateGroupCmd {
    #[must_use]
    pub fn new(owner_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            owner_id,
            name: name.into(),
            description: None,
            member_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn member(mut self, user_id: Uuid) -> Self {
        self.member_ids.push(user_id);
        self
    }

    #[must_use]
    pub fn members(mut self, user_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.member_ids.extend(user_ids);
        self
    }
}
