//! End-to-end discount engine scenarios against the in-memory adapters.
//!
//! Each test wires real handlers to `InMemoryDiscountStore` and
//! `InMemoryCustomerReader`, the same way the HTTP state does.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use storefront_discounts::adapters::memory::{InMemoryCustomerReader, InMemoryDiscountStore};
use storefront_discounts::application::handlers::discount::{
    DiscountAssessor, RecordDiscountUsageCommand, RecordDiscountUsageHandler,
    ResolveDiscountsHandler, ResolveDiscountsQuery, ValidateDiscountHandler, ValidateDiscountQuery,
    ValidateDiscountResult,
};
use storefront_discounts::domain::discount::{
    CartLineItem, CartSnapshot, Discount, DiscountCode, DiscountError, DiscountPolicy,
    DiscountReason, DiscountRules, DiscountScope, DiscountType, LimitKind, ScopeKind,
    ShopperProfile,
};
use storefront_discounts::domain::foundation::{
    CategoryId, DiscountId, Money, OrderId, ProductId, Timestamp, UserId,
};
use storefront_discounts::ports::DiscountRepository;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Engine {
    store: Arc<InMemoryDiscountStore>,
    customers: Arc<InMemoryCustomerReader>,
    assessor: Arc<DiscountAssessor>,
}

impl Engine {
    fn new() -> Self {
        let store = Arc::new(InMemoryDiscountStore::new());
        let customers = Arc::new(InMemoryCustomerReader::new());
        let assessor = Arc::new(DiscountAssessor::new(
            store.clone(),
            customers.clone(),
            DiscountPolicy::default(),
        ));
        Self {
            store,
            customers,
            assessor,
        }
    }

    async fn seed(&self, rules: DiscountRules) -> Discount {
        let discount = Discount::create(DiscountId::new(), rules, Timestamp::now()).unwrap();
        self.store.save(&discount).await.unwrap();
        discount
    }

    fn validator(&self) -> ValidateDiscountHandler {
        ValidateDiscountHandler::new(self.store.clone(), self.assessor.clone())
    }

    fn resolver(&self) -> ResolveDiscountsHandler {
        ResolveDiscountsHandler::new(self.store.clone(), self.assessor.clone(), 50)
    }

    fn recorder(&self) -> RecordDiscountUsageHandler {
        RecordDiscountUsageHandler::new(self.store.clone(), self.store.clone(), self.assessor.clone())
    }
}

fn money(value: Decimal) -> Money {
    Money::try_new(value).unwrap()
}

fn rules(code: &str, discount_type: DiscountType, value: Decimal) -> DiscountRules {
    DiscountRules::new(
        DiscountCode::try_new(code).unwrap(),
        discount_type,
        value,
        Timestamp::now().minus_days(1),
    )
}

fn cart_in(category: &str, total: Decimal) -> CartSnapshot {
    CartSnapshot::new(vec![CartLineItem::new(ProductId::new("sku-1").unwrap(), 1, money(total))
        .unwrap()
        .with_category(CategoryId::new(category).unwrap())])
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn redemption(
    discount: &Discount,
    user_id: Option<UserId>,
    order: &str,
    cart: CartSnapshot,
) -> RecordDiscountUsageCommand {
    RecordDiscountUsageCommand {
        discount_id: discount.id,
        user_id,
        order_id: OrderId::new(order).unwrap(),
        amount_saved: money(dec!(1)),
        order_total: Some(cart.subtotal()),
        cart,
    }
}

async fn validate(
    engine: &Engine,
    code: &str,
    cart: CartSnapshot,
    user_id: Option<UserId>,
) -> ValidateDiscountResult {
    engine
        .validator()
        .handle(ValidateDiscountQuery {
            code: code.to_string(),
            cart,
            user_id,
        })
        .await
}

// =============================================================================
// Validation Scenarios
// =============================================================================

#[tokio::test]
async fn percentage_discount_is_capped_by_maximum() {
    let engine = Engine::new();
    let mut r = rules("SAVE20", DiscountType::Percentage, dec!(20));
    r.maximum_discount = Some(money(dec!(15)));
    engine.seed(r).await;

    let result = validate(&engine, "save20", cart_in("general", dec!(100)), None).await;

    assert!(result.is_valid);
    assert_eq!(result.amount.unwrap().merchandise.amount(), dec!(15));
    assert_eq!(result.reason, DiscountReason::DiscountAppliedCapped);
    assert_eq!(result.discount_percentage, Some(dec!(15)));
}

#[tokio::test]
async fn fixed_amount_is_clamped_to_subtotal() {
    let engine = Engine::new();
    engine.seed(rules("FLAT10", DiscountType::FixedAmount, dec!(10))).await;

    let result = validate(&engine, "FLAT10", cart_in("general", dec!(5)), None).await;

    assert!(result.is_valid);
    assert_eq!(result.amount.unwrap().merchandise.amount(), dec!(5));
}

#[tokio::test]
async fn first_purchase_discount_rejects_returning_customer() {
    let engine = Engine::new();
    let mut r = rules("WELCOME", DiscountType::Percentage, dec!(10));
    r.first_purchase_only = true;
    engine.seed(r).await;
    engine
        .customers
        .upsert(ShopperProfile::new(user("returning")).with_completed_orders(2))
        .await;

    let result = validate(&engine, "WELCOME", cart_in("general", dec!(50)), Some(user("returning"))).await;

    assert!(!result.is_valid);
    assert_eq!(result.reason, DiscountReason::FirstTimeOnly);
}

#[tokio::test]
async fn category_scope_rejects_cart_from_other_category() {
    let engine = Engine::new();
    let mut r = rules("CATX", DiscountType::Percentage, dec!(10));
    r.scope = DiscountScope::from_parts(ScopeKind::Category, ["catA"]).unwrap();
    engine.seed(r).await;

    let result = validate(&engine, "CATX", cart_in("catB", dec!(80)), None).await;

    assert!(!result.is_valid);
    assert_eq!(result.reason, DiscountReason::NotApplicableCategories);
}

#[tokio::test]
async fn unknown_and_blank_codes_have_distinct_reasons() {
    let engine = Engine::new();
    let cart = cart_in("general", dec!(10));

    assert_eq!(validate(&engine, "  ", cart.clone(), None).await.reason, DiscountReason::EnterDiscountCode);
    assert_eq!(validate(&engine, "NOPE", cart, None).await.reason, DiscountReason::InvalidCode);
}

// =============================================================================
// Redemption
// =============================================================================

#[tokio::test]
async fn two_orders_racing_for_last_use_only_one_wins() {
    let engine = Engine::new();
    let mut r = rules("VIP5", DiscountType::FixedAmount, dec!(5));
    r.usage_limit = Some(1);
    let discount = engine.seed(r).await;
    let recorder = Arc::new(engine.recorder());

    let first = {
        let recorder = recorder.clone();
        let cmd = redemption(&discount, None, "order-a", cart_in("general", dec!(40)));
        tokio::spawn(async move { recorder.handle(cmd).await })
    };
    let second = {
        let recorder = recorder.clone();
        let cmd = redemption(&discount, None, "order-b", cart_in("general", dec!(40)));
        tokio::spawn(async move { recorder.handle(cmd).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let limited = results
        .iter()
        .filter(|r| matches!(r, Err(DiscountError::LimitExceeded { .. })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(limited, 1);
    assert_eq!(engine.store.usage_count(&discount.id).await, Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_never_exceed_usage_limit() {
    const ATTEMPTS: usize = 40;
    const LIMIT: u32 = 7;

    let engine = Engine::new();
    let mut r = rules("FLASH", DiscountType::Percentage, dec!(10));
    r.usage_limit = Some(LIMIT);
    let discount = engine.seed(r).await;
    let recorder = Arc::new(engine.recorder());

    let tasks: Vec<_> = (0..ATTEMPTS)
        .map(|i| {
            let recorder = recorder.clone();
            let cmd = redemption(
                &discount,
                Some(user(&format!("shopper-{}", i))),
                &format!("order-{}", i),
                cart_in("general", dec!(20)),
            );
            tokio::spawn(async move { recorder.handle(cmd).await })
        })
        .collect();

    let mut successes = 0u32;
    for task in tasks {
        match task.await.unwrap() {
            Ok(result) => {
                assert!(!result.already_recorded);
                successes += 1;
            }
            Err(DiscountError::LimitExceeded { limit, .. }) => {
                assert_eq!(limit, LimitKind::Global { limit: LIMIT });
            }
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(successes, LIMIT);
    assert_eq!(engine.store.usage_count(&discount.id).await, Some(LIMIT));
    assert_eq!(engine.store.record_count(&discount.id).await, LIMIT as usize);
}

#[tokio::test]
async fn repeated_confirmation_for_same_order_counts_once() {
    let engine = Engine::new();
    let discount = engine.seed(rules("ONCE", DiscountType::Percentage, dec!(10))).await;
    let recorder = engine.recorder();

    let first = recorder
        .handle(redemption(&discount, None, "order-1", cart_in("general", dec!(30))))
        .await
        .unwrap();
    let second = recorder
        .handle(redemption(&discount, None, "order-1", cart_in("general", dec!(30))))
        .await
        .unwrap();

    assert!(!first.already_recorded);
    assert!(second.already_recorded);
    assert_eq!(first.record.id, second.record.id);
    assert_eq!(engine.store.usage_count(&discount.id).await, Some(1));
}

#[tokio::test]
async fn default_user_limit_blocks_second_use_by_same_shopper() {
    let engine = Engine::new();
    let discount = engine.seed(rules("THANKS", DiscountType::FixedAmount, dec!(3))).await;
    let recorder = engine.recorder();

    recorder
        .handle(redemption(&discount, Some(user("u1")), "order-1", cart_in("general", dec!(30))))
        .await
        .unwrap();
    let again = recorder
        .handle(redemption(&discount, Some(user("u1")), "order-2", cart_in("general", dec!(30))))
        .await;

    assert!(matches!(
        again,
        Err(DiscountError::LimitExceeded {
            limit: LimitKind::PerUser { used: 1, limit: 1 },
            ..
        })
    ));

    // The live preview agrees
    let preview = validate(&engine, "THANKS", cart_in("general", dec!(30)), Some(user("u1"))).await;
    assert_eq!(preview.reason, DiscountReason::AlreadyUsed);
}

// =============================================================================
// Conflict Resolution
// =============================================================================

#[tokio::test]
async fn stackable_code_layers_with_stackable_auto_discounts() {
    let engine = Engine::new();
    let mut entered = rules("EXTRA5", DiscountType::FixedAmount, dec!(5));
    entered.stackable = true;
    engine.seed(entered).await;

    let mut auto = rules("AUTO10", DiscountType::Percentage, dec!(10));
    auto.auto_apply = true;
    auto.stackable = true;
    engine.seed(auto).await;

    let mut exclusive = rules("SOLO", DiscountType::Percentage, dec!(50));
    exclusive.auto_apply = true;
    engine.seed(exclusive).await;

    let result = engine
        .resolver()
        .handle(ResolveDiscountsQuery {
            code: Some("extra5".to_string()),
            user_id: None,
            cart: cart_in("general", dec!(100)),
        })
        .await
        .unwrap();

    let codes: Vec<_> = result.applied.applied.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, vec!["EXTRA5", "AUTO10"]);
    assert_eq!(result.applied.total_discount.amount(), dec!(15));
    assert!(result.code_rejection.is_none());
}

#[tokio::test]
async fn rejected_code_falls_back_to_best_auto_discount() {
    let engine = Engine::new();
    let mut entered = rules("BIGSPEND", DiscountType::FixedAmount, dec!(20));
    entered.minimum_purchase = Some(money(dec!(200)));
    engine.seed(entered).await;

    let mut auto = rules("SITEWIDE", DiscountType::Percentage, dec!(5));
    auto.auto_apply = true;
    engine.seed(auto).await;

    let result = engine
        .resolver()
        .handle(ResolveDiscountsQuery {
            code: Some("BIGSPEND".to_string()),
            user_id: None,
            cart: cart_in("general", dec!(100)),
        })
        .await
        .unwrap();

    assert_eq!(result.code_rejection, Some(DiscountReason::MinimumPurchase));
    assert_eq!(result.applied.applied.len(), 1);
    assert_eq!(result.applied.applied[0].code.as_str(), "SITEWIDE");
    assert_eq!(result.applied.total_discount.amount(), dec!(5));
}
