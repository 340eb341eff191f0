//! Group memberships: `(group_id, user_id) -> role`.
//!
//! The authorization gate only asks whether a row exists. The role matters
//! for managing the membership list itself.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupRole {
    Admin,
    Member,
    Guest,
}

impl GroupRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
            Self::Guest => "GUEST",
        }
    }

    pub(crate) fn can_manage_members(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl TryFrom<&str> for GroupRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            "GUEST" => Ok(Self::Guest),
            other => Err(EngineError::InvalidRole(format!(
                "invalid group role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: Uuid,
    pub username: String,
    pub role: GroupRole,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_memberships")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mapping_is_total() {
        for role in [GroupRole::Admin, GroupRole::Member, GroupRole::Guest] {
            assert_eq!(GroupRole::try_from(role.as_str()).unwrap(), role);
        }
        assert!(GroupRole::Admin.can_manage_members());
        assert!(!GroupRole::Member.can_manage_members());
        assert!(!GroupRole::Guest.can_manage_members());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(GroupRole::try_from("4").is_err());
        assert!(GroupRole::try_from("admin").is_err());
    }
}
