//! The module contains `Wallet` struct and its implementation.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

/// Who a wallet belongs to.
///
/// Storage keeps two nullable columns (`user_id`, `group_id`); exactly one of
/// them is set and this enum is the only way the engine looks at them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WalletOwner {
    Personal(Uuid),
    Group(Uuid),
}

impl WalletOwner {
    /// Rebuilds the owner from the stored column pair.
    pub(crate) fn from_columns(user_id: Option<Uuid>, group_id: Option<Uuid>) -> ResultEngine<Self> {
        match (user_id, group_id) {
            (Some(user_id), None) => Ok(Self::Personal(user_id)),
            (None, Some(group_id)) => Ok(Self::Group(group_id)),
            (Some(_), Some(_)) => Err(EngineError::InvalidId(
                "wallet has both a user and a group owner".to_string(),
            )),
            (None, None) => Err(EngineError::InvalidId("wallet has no owner".to_string())),
        }
    }

    pub(crate) fn user_column(self) -> Option<Uuid> {
        match self {
            Self::Personal(user_id) => Some(user_id),
            Self::Group(_) => None,
        }
    }

    pub(crate) fn group_column(self) -> Option<Uuid> {
        match self {
            Self::Personal(_) => None,
            Self::Group(group_id) => Some(group_id),
        }
    }
}

/// A wallet.
///
/// `balance` is a cache of the signed sum of every non-deleted transaction
/// recorded against the wallet. It only moves through relative adjustments
/// applied in the same atomic unit as the transaction write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub name: String,
    pub balance: Money,
    pub currency: Currency,
    pub owner: WalletOwner,
}

impl Wallet {
    pub fn new(name: String, currency: Currency, owner: WalletOwner) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            balance: Money::ZERO,
            currency,
            owner,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub balance: i64,
    pub currency: String,
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Group,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            name: ActiveValue::Set(value.name.clone()),
            balance: ActiveValue::Set(value.balance.minor()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            user_id: ActiveValue::Set(value.owner.user_column()),
            group_id: ActiveValue::Set(value.owner.group_column()),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            balance: Money::new(model.balance),
            currency: Currency::try_from(model.currency.as_str())?,
            owner: WalletOwner::from_columns(model.user_id, model.group_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(user_id: Option<Uuid>, group_id: Option<Uuid>) -> Model {
        Model {
            id: Uuid::new_v4(),
            name: "Cash".to_string(),
            balance: 1_500,
            currency: "IDR".to_string(),
            user_id,
            group_id,
        }
    }

    #[test]
    fn personal_and_group_owners_convert() {
        let user = Uuid::new_v4();
        let wallet = Wallet::try_from(model(Some(user), None)).unwrap();
        assert_eq!(wallet.owner, WalletOwner::Personal(user));
        assert_eq!(wallet.balance, Money::new(1_500));

        let group = Uuid::new_v4();
        let wallet = Wallet::try_from(model(None, Some(group))).unwrap();
        assert_eq!(wallet.owner, WalletOwner::Group(group));
    }

    #[test]
    fn ambiguous_or_orphaned_owner_is_rejected() {
        assert!(Wallet::try_from(model(Some(Uuid::new_v4()), Some(Uuid::new_v4()))).is_err());
        assert!(Wallet::try_from(model(None, None)).is_err());
    }

    #[test]
    fn active_model_writes_exactly_one_owner_column() {
        let group = Uuid::new_v4();
        let wallet = Wallet::new("Trip".to_string(), Currency::Idr, WalletOwner::Group(group));
        let active = ActiveModel::from(&wallet);
        assert_eq!(active.user_id, ActiveValue::Set(None));
        assert_eq!(active.group_id, ActiveValue::Set(Some(group)));
        assert_eq!(active.balance, ActiveValue::Set(0));
    }
}
