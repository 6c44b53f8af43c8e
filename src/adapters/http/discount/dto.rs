//! HTTP DTOs for discount endpoints.
//!
//! Amounts travel as decimal strings. Requests describe the cart as line items;
//! a client-supplied `cart_total` is accepted for compatibility but the items
//! are authoritative.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::handlers::discount::{
    AutoApplyDiscount, GetDiscountStatsResult, RecordDiscountUsageResult, ResolveDiscountsResult,
    ValidateDiscountResult,
};
use crate::domain::discount::{
    AppliedDiscount, CartLineItem, CartSnapshot, Discount, DiscountCode, DiscountError,
    DiscountReason, DiscountRules, DiscountScope, DiscountType, Exclusions, ScopeKind,
};
use crate::domain::foundation::{
    CategoryId, Money, OrderId, ProductId, Timestamp, ValidationError, VariantId,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// One cart line as sent by the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Overrides `unit_price * quantity` when the storefront already priced the line.
    #[serde(default)]
    pub line_total: Option<Decimal>,
}

impl CartItemRequest {
    fn into_line_item(self) -> Result<CartLineItem, ValidationError> {
        let mut item = CartLineItem::new(
            ProductId::new(self.product_id)?,
            self.quantity,
            Money::try_new_for("unit_price", self.unit_price)?,
        )?;
        if let Some(variant) = self.variant_id {
            item = item.with_variant(VariantId::new(variant)?);
        }
        if let Some(category) = self.category_id {
            item = item.with_category(CategoryId::new(category)?);
        }
        if let Some(total) = self.line_total {
            item = item.with_line_total(Money::try_new_for("line_total", total)?);
        }
        Ok(item)
    }
}

/// Builds a cart snapshot from request lines and an optional shipping charge.
pub fn cart_from_request(
    items: Vec<CartItemRequest>,
    shipping_total: Option<Decimal>,
) -> Result<CartSnapshot, DiscountError> {
    let items = items
        .into_iter()
        .map(CartItemRequest::into_line_item)
        .collect::<Result<Vec<_>, _>>()?;
    let mut cart = CartSnapshot::try_new(items)?;
    if let Some(shipping) = shipping_total {
        cart = cart.with_shipping(Money::try_new_for("shipping_total", shipping)?);
    }
    Ok(cart)
}

/// Request to validate an entered code.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateDiscountRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub cart_total: Option<Decimal>,
    #[serde(default)]
    pub shipping_total: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

/// Request for the best auto-apply discount.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoApplyRequest {
    #[serde(default)]
    pub cart_total: Option<Decimal>,
    #[serde(default)]
    pub shipping_total: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

/// Request for the full applied discount set.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveDiscountsRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub shipping_total: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

/// Request to record a redemption at order confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordUsageRequest {
    pub discount_id: String,
    pub order_id: String,
    pub amount_saved: Decimal,
    #[serde(default)]
    pub order_total: Option<Decimal>,
    #[serde(default)]
    pub shipping_total: Option<Decimal>,
    /// The confirmed cart, re-evaluated before the counter moves.
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

impl RecordUsageRequest {
    pub fn order_id(&self) -> Result<OrderId, DiscountError> {
        Ok(OrderId::new(self.order_id.clone())?)
    }

    pub fn amount_saved(&self) -> Result<Money, DiscountError> {
        Ok(Money::try_new_for("amount_saved", self.amount_saved)?)
    }

    pub fn order_total(&self) -> Result<Option<Money>, DiscountError> {
        Ok(self
            .order_total
            .map(|t| Money::try_new_for("order_total", t))
            .transpose()?)
    }
}

/// Full rule set for creating or replacing a discount.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRulesRequest {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: Decimal,
    #[serde(default)]
    pub maximum_discount: Option<Decimal>,
    #[serde(default)]
    pub minimum_purchase: Option<Decimal>,
    #[serde(default)]
    pub minimum_items: Option<u32>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub user_usage_limit: Option<u32>,
    /// Defaults to the time of the request.
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_scope")]
    pub applicable_to: ScopeKind,
    #[serde(default)]
    pub applicable_ids: Vec<String>,
    #[serde(default)]
    pub excluded_products: Vec<String>,
    #[serde(default)]
    pub excluded_categories: Vec<String>,
    #[serde(default)]
    pub first_purchase_only: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default)]
    pub customer_segments: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_scope() -> ScopeKind {
    ScopeKind::All
}

impl DiscountRulesRequest {
    /// Converts into domain rules; range checks happen in the aggregate.
    pub fn into_rules(self, now: Timestamp) -> Result<DiscountRules, DiscountError> {
        let code = DiscountCode::try_new(&self.code)?;
        let valid_from = self.valid_from.map(Timestamp::from_datetime).unwrap_or(now);

        let mut rules = DiscountRules::new(code, self.discount_type, self.discount_value, valid_from);
        rules.name = self.name;
        rules.maximum_discount = self
            .maximum_discount
            .map(|m| Money::try_new_for("maximum_discount", m))
            .transpose()?;
        rules.minimum_purchase = self
            .minimum_purchase
            .map(|m| Money::try_new_for("minimum_purchase", m))
            .transpose()?;
        rules.minimum_items = self.minimum_items;
        rules.usage_limit = self.usage_limit;
        rules.user_usage_limit = self.user_usage_limit;
        rules.valid_until = self.valid_until.map(Timestamp::from_datetime);
        rules.is_active = self.is_active;
        rules.scope = DiscountScope::from_parts(self.applicable_to, self.applicable_ids)?;
        rules.exclusions = Exclusions {
            products: self
                .excluded_products
                .into_iter()
                .map(ProductId::new)
                .collect::<Result<_, _>>()?,
            categories: self
                .excluded_categories
                .into_iter()
                .map(CategoryId::new)
                .collect::<Result<_, _>>()?,
        };
        rules.first_purchase_only = self.first_purchase_only;
        rules.priority = self.priority;
        rules.stackable = self.stackable;
        rules.auto_apply = self.auto_apply;
        rules.customer_segments = self.customer_segments.into_iter().collect();
        Ok(rules)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Outcome of a code validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateDiscountResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_discount: Option<Money>,
    pub reason: DiscountReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_off: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_waived: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<Decimal>,
    pub details: BTreeMap<String, String>,
}

impl From<ValidateDiscountResult> for ValidateDiscountResponse {
    fn from(result: ValidateDiscountResult) -> Self {
        let discount = result.discount.as_ref();
        Self {
            is_valid: result.is_valid,
            discount_id: discount.map(|d| d.id.to_string()),
            code: discount.map(|d| d.code.to_string()),
            discount_type: discount.map(|d| d.discount_type),
            discount_value: discount.map(|d| d.discount_value),
            maximum_discount: discount.and_then(|d| d.maximum_discount),
            reason: result.reason,
            amount_off: result.amount.map(|a| a.merchandise),
            shipping_waived: result.amount.map(|a| a.shipping_waived),
            discount_percentage: result.discount_percentage,
            details: result.details,
        }
    }
}

/// Best auto-apply discount, or `null` when none applies.
#[derive(Debug, Clone, Serialize)]
pub struct AutoApplyResponse {
    pub discount: Option<AutoApplyDiscountResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoApplyDiscountResponse {
    pub discount_id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub amount_off: Money,
    pub shipping_waived: Money,
    pub reason: DiscountReason,
}

impl From<Option<AutoApplyDiscount>> for AutoApplyResponse {
    fn from(best: Option<AutoApplyDiscount>) -> Self {
        Self {
            discount: best.map(|b| AutoApplyDiscountResponse {
                discount_id: b.discount.id.to_string(),
                code: b.discount.code.to_string(),
                discount_type: b.discount.discount_type,
                discount_value: b.discount.discount_value,
                amount_off: b.amount.merchandise,
                shipping_waived: b.amount.shipping_waived,
                reason: b.amount.reason(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedDiscountResponse {
    pub discount_id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub amount_off: Money,
    pub shipping_waived: Money,
    pub capped: bool,
    pub explicit: bool,
}

impl From<AppliedDiscount> for AppliedDiscountResponse {
    fn from(applied: AppliedDiscount) -> Self {
        Self {
            discount_id: applied.discount_id.to_string(),
            code: applied.code.to_string(),
            discount_type: applied.discount_type,
            amount_off: applied.amount_off,
            shipping_waived: applied.shipping_waived,
            capped: applied.capped,
            explicit: applied.explicit,
        }
    }
}

/// The final applied set for a cart.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveDiscountsResponse {
    pub applied: Vec<AppliedDiscountResponse>,
    pub total_discount: Money,
    pub total_shipping_waived: Money,
    /// Why the entered code was left out, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_rejection: Option<DiscountReason>,
}

impl From<ResolveDiscountsResult> for ResolveDiscountsResponse {
    fn from(result: ResolveDiscountsResult) -> Self {
        Self {
            applied: result
                .applied
                .applied
                .into_iter()
                .map(AppliedDiscountResponse::from)
                .collect(),
            total_discount: result.applied.total_discount,
            total_shipping_waived: result.applied.total_shipping_waived,
            code_rejection: result.code_rejection,
        }
    }
}

/// A recorded redemption.
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionResponse {
    pub id: String,
    pub discount_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub order_id: String,
    pub amount_saved: Money,
    pub already_recorded: bool,
    pub created_at: String,
}

impl From<RecordDiscountUsageResult> for RedemptionResponse {
    fn from(result: RecordDiscountUsageResult) -> Self {
        let record = result.record;
        Self {
            id: record.id.to_string(),
            discount_id: record.discount_id.to_string(),
            user_id: record.user_id.map(|u| u.to_string()),
            order_id: record.order_id.to_string(),
            amount_saved: record.amount_saved,
            already_recorded: result.already_recorded,
            created_at: record.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Admin view of a discount.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountResponse {
    pub id: String,
    pub code: String,
    pub name: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub maximum_discount: Option<Money>,
    pub minimum_purchase: Option<Money>,
    pub minimum_items: Option<u32>,
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
    pub user_usage_limit: Option<u32>,
    pub valid_from: String,
    pub valid_until: Option<String>,
    pub is_active: bool,
    pub applicable_to: ScopeKind,
    pub applicable_ids: Vec<String>,
    pub excluded_products: Vec<String>,
    pub excluded_categories: Vec<String>,
    pub first_purchase_only: bool,
    pub priority: i32,
    pub stackable: bool,
    pub auto_apply: bool,
    pub customer_segments: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Discount> for DiscountResponse {
    fn from(d: Discount) -> Self {
        Self {
            id: d.id.to_string(),
            code: d.code.to_string(),
            applicable_to: d.scope.kind(),
            applicable_ids: d.scope.ids(),
            excluded_products: d.exclusions.products.iter().map(|p| p.to_string()).collect(),
            excluded_categories: d.exclusions.categories.iter().map(|c| c.to_string()).collect(),
            name: d.name,
            discount_type: d.discount_type,
            discount_value: d.discount_value,
            maximum_discount: d.maximum_discount,
            minimum_purchase: d.minimum_purchase,
            minimum_items: d.minimum_items,
            usage_limit: d.usage_limit,
            usage_count: d.usage_count,
            user_usage_limit: d.user_usage_limit,
            valid_from: d.valid_from.as_datetime().to_rfc3339(),
            valid_until: d.valid_until.map(|t| t.as_datetime().to_rfc3339()),
            is_active: d.is_active,
            first_purchase_only: d.first_purchase_only,
            priority: d.priority,
            stackable: d.stackable,
            auto_apply: d.auto_apply,
            customer_segments: d.customer_segments.into_iter().collect(),
            created_at: d.created_at.as_datetime().to_rfc3339(),
            updated_at: d.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Usage statistics for one discount.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountStatsResponse {
    pub discount: DiscountResponse,
    pub total_uses: u64,
    pub unique_users: u64,
    pub total_saved: Money,
    pub average_order_value: Option<Money>,
    pub last_used_at: Option<String>,
}

impl From<GetDiscountStatsResult> for DiscountStatsResponse {
    fn from(result: GetDiscountStatsResult) -> Self {
        let stats = result.statistics;
        Self {
            discount: DiscountResponse::from(result.discount),
            total_uses: stats.total_uses,
            unique_users: stats.unique_users,
            total_saved: stats.total_saved,
            average_order_value: stats.average_order_value,
            last_used_at: stats.last_used_at.map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(product: &str, price: Decimal) -> CartItemRequest {
        CartItemRequest {
            product_id: product.to_string(),
            variant_id: None,
            category_id: Some("shoes".to_string()),
            quantity: 2,
            unit_price: price,
            line_total: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Cart conversion
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn cart_is_built_from_items() {
        let cart = cart_from_request(vec![item("p1", dec!(10)), item("p2", dec!(5))], Some(dec!(4.95)))
            .unwrap();
        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.subtotal().amount(), dec!(30));
        assert_eq!(cart.shipping_total().amount(), dec!(4.95));
    }

    #[test]
    fn negative_price_is_validation_error() {
        let err = cart_from_request(vec![item("p1", dec!(-1))], None).unwrap_err();
        assert!(matches!(err, DiscountError::ValidationFailed { ref field, .. } if field == "unit_price"));
    }

    #[test]
    fn huge_unit_price_is_a_validation_error() {
        let mut line = item("p1", Decimal::MAX);
        line.quantity = 2;
        let err = cart_from_request(vec![line], None).unwrap_err();
        assert!(matches!(err, DiscountError::ValidationFailed { ref field, .. } if field == "unit_price"));
    }

    #[test]
    fn huge_line_totals_are_a_validation_error() {
        let lines = (0..2)
            .map(|i| CartItemRequest {
                line_total: Some(Decimal::MAX),
                ..item(&format!("p{}", i), dec!(1))
            })
            .collect();
        let err = cart_from_request(lines, None).unwrap_err();
        assert!(matches!(err, DiscountError::ValidationFailed { ref field, .. } if field == "line_total"));
    }

    #[test]
    fn cart_above_max_subtotal_is_a_validation_error() {
        let lines = vec![item("p1", dec!(4000000000)), item("p2", dec!(4000000000))];
        let err = cart_from_request(lines, None).unwrap_err();
        assert!(matches!(err, DiscountError::ValidationFailed { ref field, .. } if field == "items"));
    }

    #[test]
    fn validate_request_accepts_legacy_cart_total() {
        let json = r#"{"code":"save20","cart_total":"100.00","items":[]}"#;
        let request: ValidateDiscountRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.cart_total, Some(dec!(100.00)));
        assert!(request.items.is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Admin rules
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn rules_request_defaults_to_active_and_all_scope() {
        let json = r#"{"code":"spring","discount_type":"percentage","discount_value":"15"}"#;
        let request: DiscountRulesRequest = serde_json::from_str(json).unwrap();
        let now = Timestamp::now();
        let rules = request.into_rules(now).unwrap();

        assert_eq!(rules.code.as_str(), "SPRING");
        assert!(rules.is_active);
        assert_eq!(rules.scope, DiscountScope::All);
        assert_eq!(rules.valid_from, now);
    }

    #[test]
    fn rules_request_builds_scope_and_exclusions() {
        let json = r#"{
            "code": "SHOES",
            "discount_type": "fixed_amount",
            "discount_value": "5",
            "applicable_to": "category",
            "applicable_ids": ["shoes"],
            "excluded_products": ["gift-card"]
        }"#;
        let request: DiscountRulesRequest = serde_json::from_str(json).unwrap();
        let rules = request.into_rules(Timestamp::now()).unwrap();

        assert_eq!(rules.scope.kind(), ScopeKind::Category);
        assert_eq!(rules.exclusions.products.len(), 1);
    }

    #[test]
    fn rules_request_rejects_blank_code() {
        let json = r#"{"code":"  ","discount_type":"percentage","discount_value":"15"}"#;
        let request: DiscountRulesRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(
            request.into_rules(Timestamp::now()),
            Err(DiscountError::ValidationFailed { .. })
        ));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Responses
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn error_response_omits_missing_details() {
        let json = serde_json::to_value(ErrorResponse::new("LIMIT_EXCEEDED", "full")).unwrap();
        assert_eq!(json["error_code"], "LIMIT_EXCEEDED");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn empty_auto_apply_serializes_null() {
        let json = serde_json::to_value(AutoApplyResponse::from(None)).unwrap();
        assert!(json["discount"].is_null());
    }
}
