use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Money, ResultEngine, Wallet, WalletOwner, group_memberships,
    transactions, util::normalize_required_text, wallets,
};

use super::{Engine, with_tx};

const WALLET_NAME_MAX: usize = 100;

/// Outcome of [`Engine::recompute_wallet_balance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputedBalance {
    pub wallet_id: Uuid,
    /// Cached balance before the recompute.
    pub previous: Money,
    /// Signed sum of the wallet's non-deleted transactions.
    pub recomputed: Money,
}

impl RecomputedBalance {
    #[must_use]
    pub fn drifted(&self) -> bool {
        self.previous != self.recomputed
    }
}

impl Engine {
    /// Returns a wallet snapshot, after the authorization gate.
    pub async fn wallet(&self, user_id: Uuid, wallet_id: Uuid) -> ResultEngine<Wallet> {
        with_tx!(self, "get wallet", |db_tx| {
            self.require_wallet_access(&db_tx, user_id, wallet_id).await
        })
    }

    /// Opens another personal wallet for `user_id`, starting at zero.
    pub async fn create_wallet(
        &self,
        user_id: Uuid,
        name: &str,
        currency: Currency,
    ) -> ResultEngine<Wallet> {
        let name = normalize_required_text(name, "wallet name", WALLET_NAME_MAX)?;
        with_tx!(self, "create wallet", |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let wallet = Wallet::new(name.clone(), currency, WalletOwner::Personal(user_id));
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;
            info!(%user_id, wallet_id = %wallet.id, currency = currency.code(), "wallet created");
            Ok(wallet)
        })
    }

    /// Lists the personal wallets of `user_id` and the wallets of every group
    /// they belong to.
    pub async fn list_wallets(&self, user_id: Uuid) -> ResultEngine<Vec<Wallet>> {
        with_tx!(self, "list wallets", |db_tx| {
            self.require_user(&db_tx, user_id).await?;

            let group_ids: Vec<Uuid> = group_memberships::Entity::find()
                .filter(group_memberships::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.group_id)
                .collect();

            let mut owner = Condition::any().add(wallets::Column::UserId.eq(user_id));
            if !group_ids.is_empty() {
                owner = owner.add(wallets::Column::GroupId.is_in(group_ids));
            }

            let models = wallets::Entity::find()
                .filter(owner)
                .order_by_asc(wallets::Column::Name)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Wallet::try_from).collect()
        })
    }

    /// Rebuilds the cached balance from the ledger.
    ///
    /// Sums every non-deleted transaction of the wallet and applies the
    /// difference to the cached balance as a relative adjustment, in one
    /// atomic unit. A difference with the previous cache is logged.
    pub async fn recompute_wallet_balance(
        &self,
        user_id: Uuid,
        wallet_id: Uuid,
    ) -> ResultEngine<RecomputedBalance> {
        with_tx!(self, "recompute wallet balance", |db_tx| {
            let wallet = self
                .require_wallet_access(&db_tx, user_id, wallet_id)
                .await?;

            let amounts: Vec<i64> = transactions::Entity::find()
                .select_only()
                .column(transactions::Column::AmountMinor)
                .filter(transactions::Column::WalletId.eq(wallet_id))
                .filter(transactions::Column::DeletedAt.is_null())
                .into_tuple()
                .all(&db_tx)
                .await?;
            let recomputed = amounts
                .into_iter()
                .try_fold(0i64, i64::checked_add)
                .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;

            let delta = recomputed
                .checked_sub(wallet.balance.minor())
                .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
            if delta != 0 {
                self.adjust_wallet_balance(&db_tx, wallet_id, delta).await?;
            }

            let outcome = RecomputedBalance {
                wallet_id,
                previous: wallet.balance,
                recomputed: Money::new(recomputed),
            };
            if outcome.drifted() {
                warn!(
                    %wallet_id,
                    previous = outcome.previous.minor(),
                    recomputed,
                    "wallet balance drifted from ledger"
                );
            } else {
                info!(%wallet_id, recomputed, "wallet balance verified");
            }
            Ok(outcome)
        })
    }
}
