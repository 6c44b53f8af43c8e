//! In-memory discount store implementing both the repository and the ledger.
//!
//! One `tokio::sync::Mutex` guards discounts and usage records together, so
//! `redeem` observes and updates `usage_count` and the record list atomically.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::discount::{
    Discount, DiscountCode, DiscountUsageRecord, LimitKind, RedemptionOutcome, RedemptionRequest,
    UsageStatistics,
};
use crate::domain::foundation::{
    DiscountId, DomainError, ErrorCode, OrderId, Timestamp, UsageRecordId, UserId,
};
use crate::ports::{DiscountRepository, UsageLedger};

#[derive(Debug, Default)]
struct StoreState {
    discounts: HashMap<DiscountId, Discount>,
    records: Vec<DiscountUsageRecord>,
}

impl StoreState {
    fn code_taken(&self, code: &DiscountCode, except: Option<&DiscountId>) -> bool {
        self.discounts
            .values()
            .any(|d| &d.code == code && Some(&d.id) != except)
    }

    fn user_usage(&self, discount_id: &DiscountId, user_id: &UserId) -> u32 {
        let count = self
            .records
            .iter()
            .filter(|r| &r.discount_id == discount_id && r.user_id.as_ref() == Some(user_id))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn order_record(&self, discount_id: &DiscountId, order_id: &OrderId) -> Option<&DiscountUsageRecord> {
        self.records
            .iter()
            .find(|r| &r.discount_id == discount_id && &r.order_id == order_id)
    }
}

/// In-memory discount repository and usage ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiscountStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryDiscountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current usage count of a discount, if it exists.
    pub async fn usage_count(&self, discount_id: &DiscountId) -> Option<u32> {
        self.state
            .lock()
            .await
            .discounts
            .get(discount_id)
            .map(|d| d.usage_count)
    }

    /// Number of usage records for a discount.
    pub async fn record_count(&self, discount_id: &DiscountId) -> usize {
        self.state
            .lock()
            .await
            .records
            .iter()
            .filter(|r| &r.discount_id == discount_id)
            .count()
    }
}

fn code_exists(code: &DiscountCode) -> DomainError {
    DomainError::new(
        ErrorCode::DiscountCodeExists,
        format!("Discount code '{}' already exists", code),
    )
    .with_detail("code", code.as_str())
}

fn not_found(id: &DiscountId) -> DomainError {
    DomainError::new(ErrorCode::DiscountNotFound, format!("Discount not found: {}", id))
}

#[async_trait]
impl DiscountRepository for InMemoryDiscountStore {
    async fn save(&self, discount: &Discount) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.code_taken(&discount.code, None) {
            return Err(code_exists(&discount.code));
        }
        let mut stored = discount.clone();
        stored.usage_count = 0;
        state.discounts.insert(stored.id, stored);
        Ok(())
    }

    async fn update(&self, discount: &Discount) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.code_taken(&discount.code, Some(&discount.id)) {
            return Err(code_exists(&discount.code));
        }
        let existing = state
            .discounts
            .get_mut(&discount.id)
            .ok_or_else(|| not_found(&discount.id))?;
        let usage_count = existing.usage_count;
        if discount.usage_limit.is_some_and(|limit| limit < usage_count) {
            return Err(DomainError::validation(
                "usage_limit",
                "usage_limit cannot be lower than the recorded usage count",
            ));
        }
        let created_at = existing.created_at;
        *existing = discount.clone();
        existing.usage_count = usage_count;
        existing.created_at = created_at;
        Ok(())
    }

    async fn find_by_id(&self, id: &DiscountId) -> Result<Option<Discount>, DomainError> {
        Ok(self.state.lock().await.discounts.get(id).cloned())
    }

    async fn find_by_code(&self, code: &DiscountCode) -> Result<Option<Discount>, DomainError> {
        Ok(self
            .state
            .lock()
            .await
            .discounts
            .values()
            .find(|d| &d.code == code)
            .cloned())
    }

    async fn list_auto_apply(&self, limit: u32) -> Result<Vec<Discount>, DomainError> {
        let state = self.state.lock().await;
        let mut discounts: Vec<Discount> = state
            .discounts
            .values()
            .filter(|d| d.is_active && d.auto_apply)
            .cloned()
            .collect();
        discounts.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.code.cmp(&b.code)));
        discounts.truncate(limit as usize);
        Ok(discounts)
    }
}

#[async_trait]
impl UsageLedger for InMemoryDiscountStore {
    async fn count_user_usage(
        &self,
        discount_id: &DiscountId,
        user_id: &UserId,
    ) -> Result<u32, DomainError> {
        Ok(self.state.lock().await.user_usage(discount_id, user_id))
    }

    async fn redeem(&self, request: &RedemptionRequest) -> Result<RedemptionOutcome, DomainError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.order_record(&request.discount_id, &request.order_id) {
            return Ok(RedemptionOutcome::AlreadyRecorded(existing.clone()));
        }

        let used_by_user = match (&request.user_id, request.enforced_user_limit()) {
            (Some(user_id), Some(_)) => Some(state.user_usage(&request.discount_id, user_id)),
            _ => None,
        };

        let discount = state
            .discounts
            .get_mut(&request.discount_id)
            .ok_or_else(|| not_found(&request.discount_id))?;

        if let Some(limit) = discount.usage_limit {
            if discount.usage_count >= limit {
                return Ok(RedemptionOutcome::LimitExceeded(LimitKind::Global { limit }));
            }
        }
        if let (Some(used), Some(limit)) = (used_by_user, request.enforced_user_limit()) {
            if used >= limit {
                return Ok(RedemptionOutcome::LimitExceeded(LimitKind::PerUser { used, limit }));
            }
        }

        discount.usage_count += 1;
        let record = request.to_record(UsageRecordId::new(), Timestamp::now());
        state.records.push(record.clone());
        Ok(RedemptionOutcome::Recorded(record))
    }

    async fn find_by_order(
        &self,
        discount_id: &DiscountId,
        order_id: &OrderId,
    ) -> Result<Option<DiscountUsageRecord>, DomainError> {
        Ok(self
            .state
            .lock()
            .await
            .order_record(discount_id, order_id)
            .cloned())
    }

    async fn statistics(&self, discount_id: &DiscountId) -> Result<UsageStatistics, DomainError> {
        let state = self.state.lock().await;
        Ok(UsageStatistics::from_records(
            state.records.iter().filter(|r| &r.discount_id == discount_id),
        ))
    }
}
