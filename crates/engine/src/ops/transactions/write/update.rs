use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::{debug, info};

use crate::{
    EngineError, ResultEngine, Transaction, UpdateTransactionCmd,
    util::{normalize_optional_text, normalize_required_text},
};

use super::super::super::{Engine, ledger::TransactionChanges, with_tx};
use super::TITLE_MAX;

impl Engine {
    /// Patches a transaction recorded by the acting user.
    ///
    /// A new amount is re-signed with the category polarity and the wallet
    /// balance moves by `new - old` in the same atomic unit. When the amount
    /// does not change only the row is written. Blank text and a zero amount
    /// leave the stored values untouched.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultEngine<Transaction> {
        let title = normalize_optional_text(cmd.title.as_deref())
            .map(|title| normalize_required_text(&title, "title", TITLE_MAX))
            .transpose()?;
        let description = normalize_optional_text(cmd.description.as_deref());
        let amount_minor = cmd.amount_minor.filter(|amount| *amount != 0);

        with_tx!(self, "update transaction", |db_tx| {
            let model = self
                .find_active_transaction(&db_tx, cmd.transaction_id)
                .await?;
            if model.user_id != cmd.user_id {
                return Err(EngineError::unauthorized());
            }
            let category = self.category_by_id(&db_tx, model.category_id).await?;

            let mut changes = TransactionChanges {
                title,
                amount_minor: None,
                description,
                occurred_at: cmd.occurred_at,
            };
            let mut delta = 0;
            if let Some(raw) = amount_minor {
                let new_amount = category.polarity.signed(raw)?.minor();
                delta = new_amount
                    .checked_sub(model.amount_minor)
                    .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
                if delta != 0 {
                    changes.amount_minor = Some(new_amount);
                }
            }

            if changes.is_empty() {
                debug!(transaction_id = %model.id, "update without changes");
                return Ok(Transaction::from_parts(model, category));
            }

            self.save_transaction(&db_tx, model.id, model.amount_minor, changes, Utc::now())
                .await?;
            if delta != 0 {
                self.adjust_wallet_balance(&db_tx, model.wallet_id, delta)
                    .await?;
            }

            let updated = self.find_active_transaction(&db_tx, model.id).await?;
            info!(transaction_id = %updated.id, delta, "transaction updated");
            Ok(Transaction::from_parts(updated, category))
        })
    }
}
