//! Shared fixtures for discount handler tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::adapters::memory::{InMemoryCustomerReader, InMemoryDiscountStore};
use crate::domain::discount::{
    CartLineItem, CartSnapshot, Discount, DiscountCode, DiscountPolicy, DiscountRules,
    DiscountType, DiscountUsageRecord, RedemptionOutcome, RedemptionRequest, UsageStatistics,
};
use crate::domain::foundation::{
    CategoryId, DiscountId, DomainError, ErrorCode, Money, OrderId, ProductId, Timestamp, UserId,
};
use crate::ports::{DiscountRepository, UsageLedger};

use super::DiscountAssessor;

pub fn money(value: Decimal) -> Money {
    Money::try_new(value).unwrap()
}

pub fn code(value: &str) -> DiscountCode {
    DiscountCode::try_new(value).unwrap()
}

/// Single-line cart in category `general`.
pub fn cart(total: Decimal) -> CartSnapshot {
    cart_in("general", total)
}

pub fn cart_in(category: &str, total: Decimal) -> CartSnapshot {
    CartSnapshot::new(vec![CartLineItem::new(ProductId::new("p1").unwrap(), 1, money(total))
        .unwrap()
        .with_category(CategoryId::new(category).unwrap())])
}

/// Active rules valid since yesterday.
pub fn rules(code_value: &str, discount_type: DiscountType, value: Decimal) -> DiscountRules {
    DiscountRules::new(code(code_value), discount_type, value, Timestamp::now().minus_days(1))
}

pub async fn seed(store: &InMemoryDiscountStore, rules: DiscountRules) -> Discount {
    let discount = Discount::create(DiscountId::new(), rules, Timestamp::now()).unwrap();
    store.save(&discount).await.unwrap();
    discount
}

pub async fn redeem_for(store: &InMemoryDiscountStore, discount: &Discount, user: Option<&str>, order: &str) {
    let request = RedemptionRequest {
        discount_id: discount.id,
        user_id: user.map(|u| UserId::new(u).unwrap()),
        order_id: OrderId::new(order).unwrap(),
        amount_saved: money(Decimal::ONE),
        order_total: None,
        user_limit: None,
    };
    store.redeem(&request).await.unwrap();
}

pub fn assessor(store: Arc<InMemoryDiscountStore>, customers: Arc<InMemoryCustomerReader>) -> Arc<DiscountAssessor> {
    Arc::new(DiscountAssessor::new(store, customers, DiscountPolicy::default()))
}

/// Repository and ledger whose every call fails.
pub struct FailingStore;

fn unavailable() -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, "Simulated database outage")
}

#[async_trait]
impl DiscountRepository for FailingStore {
    async fn save(&self, _discount: &Discount) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn update(&self, _discount: &Discount) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _id: &DiscountId) -> Result<Option<Discount>, DomainError> {
        Err(unavailable())
    }

    async fn find_by_code(&self, _code: &DiscountCode) -> Result<Option<Discount>, DomainError> {
        Err(unavailable())
    }

    async fn list_auto_apply(&self, _limit: u32) -> Result<Vec<Discount>, DomainError> {
        Err(unavailable())
    }
}

#[async_trait]
impl UsageLedger for FailingStore {
    async fn count_user_usage(&self, _discount_id: &DiscountId, _user_id: &UserId) -> Result<u32, DomainError> {
        Err(unavailable())
    }

    async fn redeem(&self, _request: &RedemptionRequest) -> Result<RedemptionOutcome, DomainError> {
        Err(unavailable())
    }

    async fn find_by_order(
        &self,
        _discount_id: &DiscountId,
        _order_id: &OrderId,
    ) -> Result<Option<DiscountUsageRecord>, DomainError> {
        Err(unavailable())
    }

    async fn statistics(&self, _discount_id: &DiscountId) -> Result<UsageStatistics, DomainError> {
        Err(unavailable())
    }
}
