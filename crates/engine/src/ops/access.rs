use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::warn;
use uuid::Uuid;

use crate::{
    EngineError, GroupRole, ResultEngine, Wallet, WalletOwner, group_memberships, users,
};

use super::{Engine, with_tx};

impl Engine {
    /// Checks whether `user_id` may operate on `wallet_id`.
    ///
    /// A personal wallet admits only its owner, a group wallet admits every
    /// member of the group. Membership is read on every call, so a removed
    /// member is rejected immediately.
    pub async fn authorize_wallet(&self, user_id: Uuid, wallet_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, "authorize wallet", |db_tx| {
            self.require_wallet_access(&db_tx, user_id, wallet_id)
                .await
                .map(|_| ())
        })
    }

    /// Loads the wallet and runs the authorization gate on it.
    ///
    /// `KeyNotFound` when the wallet is missing, `Forbidden` when the gate
    /// rejects the user.
    pub(super) async fn require_wallet_access(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        wallet_id: Uuid,
    ) -> ResultEngine<Wallet> {
        let wallet = Wallet::try_from(self.find_wallet(db_tx, wallet_id).await?)?;
        let allowed = match wallet.owner {
            WalletOwner::Personal(owner_id) => owner_id == user_id,
            WalletOwner::Group(group_id) => self.is_group_member(db_tx, group_id, user_id).await?,
        };
        if !allowed {
            warn!(%user_id, %wallet_id, "wallet access denied");
            return Err(EngineError::unauthorized());
        }
        Ok(wallet)
    }

    pub(super) async fn is_group_member(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<bool> {
        Ok(self.group_role(db_tx, group_id, user_id).await?.is_some())
    }

    pub(super) async fn group_role(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Option<GroupRole>> {
        let row = group_memberships::Entity::find_by_id((group_id, user_id))
            .one(db_tx)
            .await?;
        row.as_ref()
            .map(|m| GroupRole::try_from(m.role.as_str()))
            .transpose()
    }

    pub(super) async fn require_user(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }
}
