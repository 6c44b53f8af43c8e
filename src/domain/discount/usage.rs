//! Usage records, redemption requests and statistics.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{DiscountId, Money, OrderId, Timestamp, UsageRecordId, UserId};

/// Append-only record of one redemption. One per (discount, order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountUsageRecord {
    pub id: UsageRecordId,
    pub discount_id: DiscountId,
    /// `None` for guest checkout.
    pub user_id: Option<UserId>,
    pub order_id: OrderId,
    pub amount_saved: Money,
    pub order_total: Option<Money>,
    pub created_at: Timestamp,
}

/// A request to redeem a discount for a confirmed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionRequest {
    pub discount_id: DiscountId,
    pub user_id: Option<UserId>,
    pub order_id: OrderId,
    pub amount_saved: Money,
    pub order_total: Option<Money>,
    /// Per-user cap to re-check atomically; ignored for guests.
    pub user_limit: Option<u32>,
}

impl RedemptionRequest {
    /// The record written when the redemption succeeds.
    pub fn to_record(&self, id: UsageRecordId, created_at: Timestamp) -> DiscountUsageRecord {
        DiscountUsageRecord {
            id,
            discount_id: self.discount_id,
            user_id: self.user_id.clone(),
            order_id: self.order_id.clone(),
            amount_saved: self.amount_saved,
            order_total: self.order_total,
            created_at,
        }
    }

    /// The per-user cap that actually applies.
    pub fn enforced_user_limit(&self) -> Option<u32> {
        self.user_id.as_ref().and(self.user_limit)
    }
}

/// Which cap stopped a redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimitKind {
    Global { limit: u32 },
    PerUser { used: u32, limit: u32 },
}

/// Outcome of an atomic redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// The counter was incremented and a record written.
    Recorded(DiscountUsageRecord),
    /// This order already redeemed the discount; nothing changed.
    AlreadyRecorded(DiscountUsageRecord),
    /// A cap was reached at the moment of the increment.
    LimitExceeded(LimitKind),
}

/// Aggregate usage of one discount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStatistics {
    pub total_uses: u64,
    pub unique_users: u64,
    pub total_saved: Money,
    /// Mean of recorded order totals; `None` when no record has one.
    pub average_order_value: Option<Money>,
    pub last_used_at: Option<Timestamp>,
}

impl UsageStatistics {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a DiscountUsageRecord>,
    {
        let mut stats = UsageStatistics::default();
        let mut users = HashSet::new();
        let mut order_sum = Money::ZERO;
        let mut order_count = 0u32;

        for record in records {
            stats.total_uses += 1;
            stats.total_saved = stats.total_saved + record.amount_saved;
            if let Some(user) = &record.user_id {
                users.insert(user.clone());
            }
            if let Some(total) = record.order_total {
                order_sum = order_sum + total;
                order_count += 1;
            }
            if stats.last_used_at.map_or(true, |last| record.created_at.is_after(&last)) {
                stats.last_used_at = Some(record.created_at);
            }
        }

        stats.unique_users = users.len() as u64;
        if order_count > 0 {
            let mean = order_sum.amount() / rust_decimal::Decimal::from(order_count);
            stats.average_order_value = Some(Money::saturating(mean).rounded());
        }
        stats
    }
}
