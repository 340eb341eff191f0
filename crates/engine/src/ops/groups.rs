use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryOrder, TransactionTrait, prelude::*,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    CreateGroupCmd, Currency, EngineError, Group, GroupDetail, GroupMember, GroupOverview,
    GroupRole, ResultEngine, Wallet, WalletOwner, group_memberships, groups, users,
    util::{normalize_optional_text, normalize_required_text},
    wallets,
};

use super::{Engine, with_tx};

const GROUP_NAME_MAX: usize = 100;

impl Engine {
    /// Creates a group, its shared wallet and its memberships in one atomic unit.
    ///
    /// The owner becomes `Admin`, every other listed user `Member`. Repeated
    /// ids collapse into one membership.
    pub async fn create_group(&self, cmd: CreateGroupCmd) -> ResultEngine<(Group, Wallet)> {
        let name = normalize_required_text(&cmd.name, "group name", GROUP_NAME_MAX)?;
        let description = normalize_optional_text(cmd.description.as_deref());
        let owner_id = cmd.owner_id;
        let member_ids: BTreeSet<Uuid> = cmd
            .member_ids
            .into_iter()
            .filter(|id| *id != owner_id)
            .collect();

        with_tx!(self, "create group", |db_tx| {
            self.require_user(&db_tx, owner_id).await?;
            for member_id in &member_ids {
                self.require_user(&db_tx, *member_id).await?;
            }

            let group_id = Uuid::new_v4();
            let group_model = groups::ActiveModel {
                id: ActiveValue::Set(group_id),
                name: ActiveValue::Set(name.clone()),
                description: ActiveValue::Set(description.clone()),
                owner_id: ActiveValue::Set(owner_id),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            let wallet = Wallet::new(
                format!("Wallet {name}"),
                Currency::default(),
                WalletOwner::Group(group_id),
            );
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;

            self.insert_membership(&db_tx, group_id, owner_id, GroupRole::Admin)
                .await?;
            for member_id in &member_ids {
                self.insert_membership(&db_tx, group_id, *member_id, GroupRole::Member)
                    .await?;
            }

            info!(%group_id, %owner_id, members = member_ids.len() + 1, "group created");
            Ok((Group::from(group_model), wallet))
        })
    }

    /// Adds `user_id` to the group. Only group admins may do this.
    pub async fn add_group_member(
        &self,
        actor_id: Uuid,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> ResultEngine<()> {
        with_tx!(self, "add group member", |db_tx| {
            self.require_group_admin(&db_tx, actor_id, group_id).await?;
            self.require_user(&db_tx, user_id).await?;
            if self.group_role(&db_tx, group_id, user_id).await?.is_some() {
                return Err(EngineError::ExistingKey("group member".to_string()));
            }
            self.insert_membership(&db_tx, group_id, user_id, role)
                .await?;
            info!(%group_id, %user_id, role = role.as_str(), "group member added");
            Ok(())
        })
    }

    /// Removes `user_id` from the group. Only group admins may do this and
    /// the group owner cannot be removed.
    pub async fn remove_group_member(
        &self,
        actor_id: Uuid,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, "remove group member", |db_tx| {
            let group = self.require_group_admin(&db_tx, actor_id, group_id).await?;
            if group.owner_id == user_id {
                return Err(EngineError::Conflict(
                    "group owner cannot be removed".to_string(),
                ));
            }
            let result = group_memberships::Entity::delete_by_id((group_id, user_id))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(
                    "membership not exists".to_string(),
                ));
            }
            info!(%group_id, %user_id, "group member removed");
            Ok(())
        })
    }

    /// Lists the members of a group with their roles. Any member may look.
    pub async fn group_members(
        &self,
        actor_id: Uuid,
        group_id: Uuid,
    ) -> ResultEngine<Vec<GroupMember>> {
        with_tx!(self, "list group members", |db_tx| {
            self.require_group_member(&db_tx, actor_id, group_id)
                .await?;
            self.members_of(&db_tx, group_id).await
        })
    }

    /// Lists the groups `actor_id` belongs to, by name.
    pub async fn list_groups(&self, actor_id: Uuid) -> ResultEngine<Vec<GroupOverview>> {
        with_tx!(self, "list groups", |db_tx| {
            self.require_user(&db_tx, actor_id).await?;

            let group_ids: Vec<Uuid> = group_memberships::Entity::find()
                .filter(group_memberships::Column::UserId.eq(actor_id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.group_id)
                .collect();
            if group_ids.is_empty() {
                return Ok(Vec::new());
            }

            let models = groups::Entity::find()
                .filter(groups::Column::Id.is_in(group_ids))
                .order_by_asc(groups::Column::Name)
                .all(&db_tx)
                .await?;

            let mut overviews = Vec::with_capacity(models.len());
            for model in models {
                let wallet = self.group_wallet(&db_tx, model.id).await?;
                let member_count = group_memberships::Entity::find()
                    .filter(group_memberships::Column::GroupId.eq(model.id))
                    .count(&db_tx)
                    .await?;
                overviews.push(GroupOverview {
                    group: Group::from(model),
                    wallet,
                    member_count,
                });
            }
            Ok(overviews)
        })
    }

    /// Returns a group with its wallet and members. Only members may look.
    pub async fn group(&self, actor_id: Uuid, group_id: Uuid) -> ResultEngine<GroupDetail> {
        with_tx!(self, "get group", |db_tx| {
            let model = self
                .require_group_member(&db_tx, actor_id, group_id)
                .await?;
            let wallet = self.group_wallet(&db_tx, group_id).await?;
            let members = self.members_of(&db_tx, group_id).await?;
            Ok(GroupDetail {
                group: Group::from(model),
                wallet,
                members,
            })
        })
    }

    async fn require_group_member(
        &self,
        db_tx: &DatabaseTransaction,
        actor_id: Uuid,
        group_id: Uuid,
    ) -> ResultEngine<groups::Model> {
        let group = groups::Entity::find_by_id(group_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        if !self.is_group_member(db_tx, group_id, actor_id).await? {
            return Err(EngineError::unauthorized());
        }
        Ok(group)
    }

    async fn group_wallet(&self, db_tx: &DatabaseTransaction, group_id: Uuid) -> ResultEngine<Wallet> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::GroupId.eq(group_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))?;
        Wallet::try_from(model)
    }

    async fn members_of(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<GroupMember>> {
        let rows = group_memberships::Entity::find()
            .filter(group_memberships::Column::GroupId.eq(group_id))
            .find_also_related(users::Entity)
            .order_by_asc(users::Column::Username)
            .all(db_tx)
            .await?;

        rows.into_iter()
            .map(|(membership, user)| {
                let user = user
                    .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
                Ok(GroupMember {
                    user_id: membership.user_id,
                    username: user.username,
                    role: GroupRole::try_from(membership.role.as_str())?,
                })
            })
            .collect()
    }

    async fn require_group_admin(
        &self,
        db_tx: &DatabaseTransaction,
        actor_id: Uuid,
        group_id: Uuid,
    ) -> ResultEngine<groups::Model> {
        let group = groups::Entity::find_by_id(group_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        let role = self.group_role(db_tx, group_id, actor_id).await?;
        if !role.is_some_and(GroupRole::can_manage_members) {
            return Err(EngineError::unauthorized());
        }
        Ok(group)
    }

    async fn insert_membership(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> ResultEngine<()> {
        group_memberships::ActiveModel {
            group_id: ActiveValue::Set(group_id),
            user_id: ActiveValue::Set(user_id),
            role: ActiveValue::Set(role.as_str().to_string()),
        }
        .insert(db_tx)
        .await?;
        Ok(())
    }
}
