//! Categories and their polarity.
//!
//! A category is either global (shipped defaults), private to one user or
//! shared by a group. Its polarity decides the sign of every amount recorded
//! under it and never changes after creation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// Whether money enters (`Income`) or leaves (`Expense`) a wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarity {
    Income,
    Expense,
}

impl Polarity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Applies the polarity to a caller supplied magnitude.
    ///
    /// The caller's sign is ignored: `Expense` always yields a negative
    /// amount and `Income` a positive one. A zero magnitude is rejected.
    pub fn signed(self, raw_minor: i64) -> ResultEngine<Money> {
        let magnitude = raw_minor
            .checked_abs()
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
        if magnitude == 0 {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Money::new(match self {
            Self::Income => magnitude,
            Self::Expense => -magnitude,
        }))
    }
}

impl TryFrom<&str> for Polarity {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            other => Err(EngineError::InvalidPolarity(format!(
                "invalid category type: {other}"
            ))),
        }
    }
}

/// Visibility of a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CategoryScope {
    Global,
    User(Uuid),
    Group(Uuid),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub polarity: Polarity,
    pub scope: CategoryScope,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub polarity: String,
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let scope = match (model.user_id, model.group_id) {
            (None, None) => CategoryScope::Global,
            (Some(user_id), None) => CategoryScope::User(user_id),
            (None, Some(group_id)) => CategoryScope::Group(group_id),
            (Some(_), Some(_)) => {
                return Err(EngineError::InvalidId(
                    "category has both a user and a group scope".to_string(),
                ));
            }
        };
        Ok(Self {
            id: model.id,
            name: model.name,
            polarity: Polarity::try_from(model.polarity.as_str())?,
            scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_is_always_negative() {
        assert_eq!(Polarity::Expense.signed(200).unwrap(), Money::new(-200));
        assert_eq!(Polarity::Expense.signed(-200).unwrap(), Money::new(-200));
    }

    #[test]
    fn income_is_always_positive() {
        assert_eq!(Polarity::Income.signed(500).unwrap(), Money::new(500));
        assert_eq!(Polarity::Income.signed(-500).unwrap(), Money::new(500));
    }

    #[test]
    fn zero_and_overflowing_magnitudes_are_rejected() {
        assert!(matches!(
            Polarity::Income.signed(0),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(Polarity::Expense.signed(i64::MIN).is_err());
    }

    #[test]
    fn stored_polarity_must_be_known() {
        assert_eq!(Polarity::try_from("expense").unwrap(), Polarity::Expense);
        assert!(matches!(
            Polarity::try_from("TRANSFER"),
            Err(EngineError::InvalidPolarity(_))
        ));
    }
}
