//! Usage ledger port.
//!
//! The ledger is the single source of truth for `usage_count` and the
//! append-only usage records. `redeem` is the only operation that mutates
//! either, and it must be atomic: re-check the global and per-user caps,
//! increment the counter, and append one record, all or nothing.
//!
//! # Idempotency
//!
//! The pair `(discount_id, order_id)` identifies a redemption. Redeeming the
//! same pair again returns `AlreadyRecorded` with the original record and
//! changes nothing.

use crate::domain::discount::{DiscountUsageRecord, RedemptionOutcome, RedemptionRequest, UsageStatistics};
use crate::domain::foundation::{DiscountId, DomainError, OrderId, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// How many times `user_id` has redeemed the discount.
    async fn count_user_usage(
        &self,
        discount_id: &DiscountId,
        user_id: &UserId,
    ) -> Result<u32, DomainError>;

    /// Atomically redeem a discount for an order.
    ///
    /// Cap violations are returned as `RedemptionOutcome::LimitExceeded`, not errors.
    ///
    /// # Errors
    ///
    /// - `DiscountNotFound` if the discount doesn't exist
    /// - `DatabaseError` on persistence failure; nothing was written
    async fn redeem(&self, request: &RedemptionRequest) -> Result<RedemptionOutcome, DomainError>;

    /// The record for an order, if it redeemed the discount.
    async fn find_by_order(
        &self,
        discount_id: &DiscountId,
        order_id: &OrderId,
    ) -> Result<Option<DiscountUsageRecord>, DomainError>;

    /// Aggregate usage for reporting.
    async fn statistics(&self, discount_id: &DiscountId) -> Result<UsageStatistics, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn UsageLedger) {}
    }
}
