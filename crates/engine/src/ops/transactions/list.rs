use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{Category, EngineError, ResultEngine, Transaction, categories, transactions};

use super::super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
/// Deleted transactions are never returned.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub wallet_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidFilter(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::InvalidFilter(
            "limit must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn with_category(
    rows: Vec<(transactions::Model, Option<categories::Model>)>,
) -> ResultEngine<Vec<Transaction>> {
    rows.into_iter()
        .map(|(model, category)| {
            let category = category
                .ok_or_else(|| EngineError::InvalidId("transaction without category".to_string()))?;
            Ok(Transaction::from_parts(model, Category::try_from(category)?))
        })
        .collect()
}

impl Engine {
    /// Returns one transaction recorded by `user_id`.
    pub async fn transaction(&self, user_id: Uuid, transaction_id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, "get transaction", |db_tx| {
            let model = self.find_active_transaction(&db_tx, transaction_id).await?;
            if model.user_id != user_id {
                return Err(EngineError::unauthorized());
            }
            let category = self.category_by_id(&db_tx, model.category_id).await?;
            Ok(Transaction::from_parts(model, category))
        })
    }

    /// Lists the transactions recorded by `user_id`, newest first.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;

        with_tx!(self, "list transactions", |db_tx| {
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(transactions::Column::DeletedAt.is_null());
            if let Some(wallet_id) = filter.wallet_id {
                query = query.filter(transactions::Column::WalletId.eq(wallet_id));
            }
            if let Some(from) = filter.from {
                query = query.filter(transactions::Column::OccurredAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(transactions::Column::OccurredAt.lt(to));
            }

            let rows = query
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::CreatedAt)
                .limit(filter.limit)
                .find_also_related(categories::Entity)
                .all(&db_tx)
                .await?;
            with_category(rows)
        })
    }

    /// Lists the transactions of a wallet from every user who can write to
    /// it, newest first. The caller must pass the authorization gate.
    pub async fn wallet_transactions(
        &self,
        user_id: Uuid,
        wallet_id: Uuid,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, "list wallet transactions", |db_tx| {
            self.require_wallet_access(&db_tx, user_id, wallet_id)
                .await?;
            let rows = transactions::Entity::find()
                .filter(transactions::Column::WalletId.eq(wallet_id))
                .filter(transactions::Column::DeletedAt.is_null())
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::CreatedAt)
                .limit(limit)
                .find_also_related(categories::Entity)
                .all(&db_tx)
                .await?;
            with_category(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn rejects_empty_range_and_zero_limit() {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 15, 4, 5).unwrap();
        let filter = TransactionListFilter {
            from: Some(at),
            to: Some(at),
            ..Default::default()
        };
        assert_eq!(
            validate_list_filter(&filter),
            Err(EngineError::InvalidFilter(
                "invalid range: from must be < to".to_string()
            ))
        );

        let filter = TransactionListFilter {
            limit: Some(0),
            ..Default::default()
        };
        let err = validate_list_filter(&filter).unwrap_err();
        assert!(matches!(err, EngineError::InvalidFilter(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert!(validate_list_filter(&TransactionListFilter::default()).is_ok());
    }
}
