use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait};
use tracing::info;
use uuid::Uuid;

use crate::{
    CreateTransactionCmd, EngineError, ResultEngine, Transaction, WalletOwner, transactions,
    util::{normalize_optional_text, normalize_required_text},
};

use super::super::super::{Engine, with_tx};
use super::TITLE_MAX;

impl Engine {
    /// Records an income or expense transaction on a wallet.
    ///
    /// The sign of the stored amount comes from the category polarity, the
    /// caller only supplies a positive magnitude. The row insert and the
    /// wallet balance increment commit together; on any failure neither is
    /// visible.
    pub async fn create_transaction(&self, cmd: CreateTransactionCmd) -> ResultEngine<Transaction> {
        let title = normalize_required_text(&cmd.title, "title", TITLE_MAX)?;
        let description = normalize_optional_text(cmd.description.as_deref());
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }

        with_tx!(self, "create transaction", |db_tx| {
            let wallet = self
                .require_wallet_access(&db_tx, cmd.user_id, cmd.wallet_id)
                .await?;
            let wallet_group_id = match wallet.owner {
                WalletOwner::Group(group_id) => Some(group_id),
                WalletOwner::Personal(_) => None,
            };
            let category = self
                .resolve_category(&db_tx, cmd.user_id, wallet_group_id, &cmd.category)
                .await?;
            let amount = category.polarity.signed(cmd.amount_minor)?;

            let now = Utc::now();
            let model = self
                .insert_transaction(
                    &db_tx,
                    transactions::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4()),
                        user_id: ActiveValue::Set(cmd.user_id),
                        wallet_id: ActiveValue::Set(wallet.id),
                        category_id: ActiveValue::Set(category.id),
                        title: ActiveValue::Set(title.clone()),
                        amount_minor: ActiveValue::Set(amount.minor()),
                        description: ActiveValue::Set(description.clone()),
                        occurred_at: ActiveValue::Set(cmd.occurred_at),
                        created_at: ActiveValue::Set(now),
                        updated_at: ActiveValue::Set(now),
                        deleted_at: ActiveValue::Set(None),
                    },
                )
                .await?;
            self.adjust_wallet_balance(&db_tx, wallet.id, amount.minor())
                .await?;

            info!(
                transaction_id = %model.id,
                wallet_id = %wallet.id,
                amount = amount.minor(),
                "transaction created"
            );
            Ok(Transaction::from_parts(model, category))
        })
    }
}
