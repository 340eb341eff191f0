use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

use super::super::super::{Engine, with_tx};

impl Engine {
    /// Soft deletes a transaction recorded by the acting user.
    ///
    /// This:
    /// - sets `deleted_at` on the transaction row
    /// - reverts its amount on the wallet balance
    ///
    /// Deleted transactions are hidden from every read. Deleting twice is a
    /// `Conflict` and never reverts the amount again. `wallet_id` must be the
    /// wallet the transaction was recorded on.
    pub async fn delete_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        wallet_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, "delete transaction", |db_tx| {
            let model = self.find_transaction(&db_tx, transaction_id).await?;
            if model.user_id != user_id {
                return Err(EngineError::unauthorized());
            }
            if model.wallet_id != wallet_id {
                return Err(EngineError::KeyNotFound(
                    "transaction not exists".to_string(),
                ));
            }
            if model.deleted_at.is_some() {
                warn!(%transaction_id, "transaction already deleted");
                return Err(EngineError::Conflict(
                    "transaction already deleted".to_string(),
                ));
            }

            let reversal = -model.amount_minor;
            self.mark_deleted(&db_tx, model.id, Utc::now()).await?;
            self.adjust_wallet_balance(&db_tx, model.wallet_id, reversal)
                .await?;

            info!(%transaction_id, %wallet_id, delta = reversal, "transaction deleted");
            Ok(())
        })
    }
}
