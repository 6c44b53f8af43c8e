//! GetDiscountStatsHandler - Query handler for admin usage statistics.

use std::sync::Arc;

use crate::domain::discount::{Discount, DiscountError, UsageStatistics};
use crate::domain::foundation::DiscountId;
use crate::ports::{DiscountRepository, UsageLedger};

#[derive(Debug, Clone)]
pub struct GetDiscountStatsQuery {
    pub discount_id: DiscountId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDiscountStatsResult {
    pub discount: Discount,
    pub statistics: UsageStatistics,
}

pub struct GetDiscountStatsHandler {
    discounts: Arc<dyn DiscountRepository>,
    ledger: Arc<dyn UsageLedger>,
}

impl GetDiscountStatsHandler {
    pub fn new(discounts: Arc<dyn DiscountRepository>, ledger: Arc<dyn UsageLedger>) -> Self {
        Self { discounts, ledger }
    }

    pub async fn handle(&self, query: GetDiscountStatsQuery) -> Result<GetDiscountStatsResult, DiscountError> {
        let discount = self
            .discounts
            .find_by_id(&query.discount_id)
            .await?
            .ok_or_else(|| DiscountError::not_found(query.discount_id))?;

        let statistics = self.ledger.statistics(&discount.id).await?;

        Ok(GetDiscountStatsResult {
            discount,
            statistics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDiscountStore;
    use crate::application::handlers::discount::fixtures::*;
    use crate::domain::discount::DiscountType;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn reports_usage_statistics() {
        let store = Arc::new(InMemoryDiscountStore::new());
        let d = seed(&store, rules("SPRING", DiscountType::Percentage, dec!(15))).await;
        redeem_for(&store, &d, Some("u1"), "o-1").await;
        redeem_for(&store, &d, None, "o-2").await;

        let result = GetDiscountStatsHandler::new(store.clone(), store)
            .handle(GetDiscountStatsQuery { discount_id: d.id })
            .await
            .unwrap();

        assert_eq!(result.statistics.total_uses, 2);
        assert_eq!(result.statistics.unique_users, 1);
        assert_eq!(result.statistics.total_saved.amount(), dec!(2));
        assert_eq!(result.discount.usage_count, 2);
    }

    #[tokio::test]
    async fn stats_failure_is_infrastructure_error() {
        let store = Arc::new(InMemoryDiscountStore::new());
        let d = seed(&store, rules("SPRING", DiscountType::Percentage, dec!(15))).await;

        let result = GetDiscountStatsHandler::new(store, Arc::new(FailingStore))
            .handle(GetDiscountStatsQuery { discount_id: d.id })
            .await;
        assert!(matches!(result, Err(DiscountError::Infrastructure(_))));
    }
}
