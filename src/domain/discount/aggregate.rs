//! Discount aggregate entity.
//!
//! A Discount is a promotional rule keyed by a unique normalized code. Admin
//! edits go through [`DiscountRules`], which is validated and normalized as a
//! whole; `usage_count` is owned by the usage ledger and never set from here.
//!
//! # Design Decisions
//!
//! - **Decimal money**: amounts are `Money`, rounded once at the end of a calculation
//! - **Normalized scope**: a non-`All` scope with no ids is stored as `All`
//! - **Half-open window**: valid on `[valid_from, valid_until)`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::foundation::{
    DiscountId, Money, Timestamp, UserId, ValidationError, CURRENCY_SCALE,
};

use super::shopper::normalize_segments;
use super::{DiscountCode, DiscountPolicy, DiscountScope, DiscountType, Exclusions, ScopeKind};

const MAX_NAME_LENGTH: usize = 120;

/// Counts are stored as `INTEGER`.
const MAX_COUNT: u32 = i32::MAX as u32;

/// The admin-editable part of a discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRules {
    pub code: DiscountCode,
    pub name: Option<String>,
    pub discount_type: DiscountType,
    /// Percent points for percentage, currency units for fixed amount.
    pub discount_value: Decimal,
    pub maximum_discount: Option<Money>,
    pub minimum_purchase: Option<Money>,
    pub minimum_items: Option<u32>,
    pub usage_limit: Option<u32>,
    pub user_usage_limit: Option<u32>,
    pub valid_from: Timestamp,
    pub valid_until: Option<Timestamp>,
    pub is_active: bool,
    pub scope: DiscountScope,
    pub exclusions: Exclusions,
    pub first_purchase_only: bool,
    pub priority: i32,
    pub stackable: bool,
    pub auto_apply: bool,
    pub customer_segments: BTreeSet<String>,
}

impl DiscountRules {
    /// An active, unrestricted rule set starting at `valid_from`.
    pub fn new(
        code: DiscountCode,
        discount_type: DiscountType,
        discount_value: Decimal,
        valid_from: Timestamp,
    ) -> Self {
        Self {
            code,
            name: None,
            discount_type,
            discount_value,
            maximum_discount: None,
            minimum_purchase: None,
            minimum_items: None,
            usage_limit: None,
            user_usage_limit: None,
            valid_from,
            valid_until: None,
            is_active: true,
            scope: DiscountScope::All,
            exclusions: Exclusions::default(),
            first_purchase_only: false,
            priority: 0,
            stackable: false,
            auto_apply: false,
            customer_segments: BTreeSet::new(),
        }
    }

    /// Checks value ranges and the validity window, then normalizes scope,
    /// segments and name.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first offending field.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        match self.discount_type {
            DiscountType::Percentage => {
                if self.discount_value <= Decimal::ZERO || self.discount_value > Decimal::ONE_HUNDRED {
                    return Err(ValidationError::invalid_format(
                        "discount_value",
                        "percentage must be greater than 0 and at most 100",
                    ));
                }
            }
            DiscountType::FixedAmount => {
                if self.discount_value <= Decimal::ZERO {
                    return Err(ValidationError::invalid_format(
                        "discount_value",
                        "fixed amount must be greater than 0",
                    ));
                }
                Money::try_new_for("discount_value", self.discount_value)?;
            }
            DiscountType::FreeShipping => {
                self.discount_value = Decimal::ZERO;
            }
        }

        check_scale("discount_value", self.discount_value)?;
        if let Some(max) = self.maximum_discount {
            check_scale("maximum_discount", max.amount())?;
        }
        if let Some(min) = self.minimum_purchase {
            check_scale("minimum_purchase", min.amount())?;
        }
        check_count("minimum_items", 0, self.minimum_items)?;
        check_count("usage_limit", 1, self.usage_limit)?;
        check_count("user_usage_limit", 1, self.user_usage_limit)?;

        if let Some(until) = &self.valid_until {
            if !until.is_after(&self.valid_from) {
                return Err(ValidationError::invalid_format(
                    "valid_until",
                    "must be after valid_from",
                ));
            }
        }

        self.name = match self.name.take() {
            Some(name) if name.trim().is_empty() => None,
            Some(name) => {
                let name = name.trim().to_string();
                if name.chars().count() > MAX_NAME_LENGTH {
                    return Err(ValidationError::out_of_range(
                        "name",
                        0,
                        MAX_NAME_LENGTH as i64,
                        name.chars().count() as i64,
                    ));
                }
                Some(name)
            }
            None => None,
        };

        self.scope = self.scope.normalized();
        self.customer_segments = normalize_segments(&self.customer_segments);
        Ok(self)
    }
}

fn check_scale(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > CURRENCY_SCALE {
        return Err(ValidationError::invalid_format(
            field,
            format!("must have at most {} decimal places", CURRENCY_SCALE),
        ));
    }
    Ok(())
}

fn check_count(field: &str, min: u32, value: Option<u32>) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < min || v > MAX_COUNT => Err(ValidationError::out_of_range(
            field,
            i64::from(min),
            i64::from(MAX_COUNT),
            i64::from(v),
        )),
        _ => Ok(()),
    }
}

/// Discount aggregate.
///
/// # Invariants
///
/// - `code` is unique across discounts (enforced by the repository)
/// - `usage_count <= usage_limit` when a limit is set (enforced at redemption
///   and by `revise`)
/// - `valid_until > valid_from` when set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub code: DiscountCode,
    pub name: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub maximum_discount: Option<Money>,
    pub minimum_purchase: Option<Money>,
    pub minimum_items: Option<u32>,
    pub usage_limit: Option<u32>,
    /// Successful redemptions so far. Written only by the usage ledger.
    pub usage_count: u32,
    pub user_usage_limit: Option<u32>,
    pub valid_from: Timestamp,
    pub valid_until: Option<Timestamp>,
    pub is_active: bool,
    pub scope: DiscountScope,
    pub exclusions: Exclusions,
    pub first_purchase_only: bool,
    pub priority: i32,
    pub stackable: bool,
    pub auto_apply: bool,
    pub customer_segments: BTreeSet<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Discount {
    /// Creates a discount from validated rules with zero usage.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the rules are invalid.
    pub fn create(id: DiscountId, rules: DiscountRules, now: Timestamp) -> Result<Self, ValidationError> {
        let rules = rules.validated()?;
        let mut discount = Self {
            id,
            code: rules.code.clone(),
            name: None,
            discount_type: rules.discount_type,
            discount_value: Decimal::ZERO,
            maximum_discount: None,
            minimum_purchase: None,
            minimum_items: None,
            usage_limit: None,
            usage_count: 0,
            user_usage_limit: None,
            valid_from: now,
            valid_until: None,
            is_active: true,
            scope: DiscountScope::All,
            exclusions: Exclusions::default(),
            first_purchase_only: false,
            priority: 0,
            stackable: false,
            auto_apply: false,
            customer_segments: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        discount.assign(rules);
        Ok(discount)
    }

    /// Replaces the editable rules, keeping id, usage count and creation time.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the rules are invalid or `usage_limit` falls
    /// below the redemptions already recorded; the discount is left unchanged.
    pub fn revise(&mut self, rules: DiscountRules, now: Timestamp) -> Result<(), ValidationError> {
        let rules = rules.validated()?;
        if let Some(limit) = rules.usage_limit {
            if limit < self.usage_count {
                return Err(ValidationError::out_of_range(
                    "usage_limit",
                    i64::from(self.usage_count),
                    i64::from(MAX_COUNT),
                    i64::from(limit),
                ));
            }
        }
        self.assign(rules);
        self.updated_at = now;
        Ok(())
    }

    /// Flips `is_active` and returns the new state.
    pub fn toggle(&mut self, now: Timestamp) -> bool {
        self.is_active = !self.is_active;
        self.updated_at = now;
        self.is_active
    }

    /// The current editable rules.
    pub fn rules(&self) -> DiscountRules {
        DiscountRules {
            code: self.code.clone(),
            name: self.name.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            maximum_discount: self.maximum_discount,
            minimum_purchase: self.minimum_purchase,
            minimum_items: self.minimum_items,
            usage_limit: self.usage_limit,
            user_usage_limit: self.user_usage_limit,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
            scope: self.scope.clone(),
            exclusions: self.exclusions.clone(),
            first_purchase_only: self.first_purchase_only,
            priority: self.priority,
            stackable: self.stackable,
            auto_apply: self.auto_apply,
            customer_segments: self.customer_segments.clone(),
        }
    }

    fn assign(&mut self, rules: DiscountRules) {
        self.code = rules.code;
        self.name = rules.name;
        self.discount_type = rules.discount_type;
        self.discount_value = rules.discount_value;
        self.maximum_discount = rules.maximum_discount;
        self.minimum_purchase = rules.minimum_purchase;
        self.minimum_items = rules.minimum_items;
        self.usage_limit = rules.usage_limit;
        self.user_usage_limit = rules.user_usage_limit;
        self.valid_from = rules.valid_from;
        self.valid_until = rules.valid_until;
        self.is_active = rules.is_active;
        self.scope = rules.scope;
        self.exclusions = rules.exclusions;
        self.first_purchase_only = rules.first_purchase_only;
        self.priority = rules.priority;
        self.stackable = rules.stackable;
        self.auto_apply = rules.auto_apply;
        self.customer_segments = rules.customer_segments;
    }

    pub fn scope_kind(&self) -> ScopeKind {
        self.scope.kind()
    }

    /// True if `now` falls inside `[valid_from, valid_until)`.
    pub fn is_within_window(&self, now: &Timestamp) -> bool {
        !now.is_before(&self.valid_from)
            && self.valid_until.map_or(true, |until| now.is_before(&until))
    }

    /// True once the global cap has been reached.
    pub fn usage_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.usage_count >= limit)
    }

    /// Guests may not use discounts with per-shopper restrictions.
    pub fn requires_login(&self) -> bool {
        self.scope_kind() == ScopeKind::User
            || self.user_usage_limit.is_some()
            || self.first_purchase_only
            || !self.customer_segments.is_empty()
    }

    /// Per-shopper cap: the discount's own, else the store default.
    pub fn effective_user_limit(&self, policy: &DiscountPolicy) -> Option<u32> {
        self.user_usage_limit.or(policy.default_user_usage_limit)
    }

    /// True if the discount is restricted to listed users and `user_id` is one of them.
    ///
    /// Always true for scopes other than `User`.
    pub fn targets_user(&self, user_id: &UserId) -> bool {
        match &self.scope {
            DiscountScope::User(users) => users.contains(user_id),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::discount::ScopeKind;
    use rust_decimal_macros::dec;

    fn code(value: &str) -> DiscountCode {
        DiscountCode::try_new(value).unwrap()
    }

    fn rules(discount_type: DiscountType, value: Decimal) -> DiscountRules {
        DiscountRules::new(code("SAVE20"), discount_type, value, Timestamp::now().minus_days(1))
    }

    fn discount() -> Discount {
        Discount::create(
            DiscountId::new(),
            rules(DiscountType::Percentage, dec!(20)),
            Timestamp::now(),
        )
        .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rule validation
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn percentage_must_be_within_range() {
        assert!(rules(DiscountType::Percentage, dec!(0)).validated().is_err());
        assert!(rules(DiscountType::Percentage, dec!(100.01)).validated().is_err());
        assert!(rules(DiscountType::Percentage, dec!(100)).validated().is_ok());
    }

    #[test]
    fn fixed_amount_must_be_positive() {
        let err = rules(DiscountType::FixedAmount, dec!(0)).validated().unwrap_err();
        assert_eq!(err.field(), "discount_value");
    }

    #[test]
    fn free_shipping_value_is_zeroed() {
        let r = rules(DiscountType::FreeShipping, dec!(7)).validated().unwrap();
        assert_eq!(r.discount_value, Decimal::ZERO);
    }

    #[test]
    fn zero_usage_limits_are_rejected() {
        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.usage_limit = Some(0);
        assert_eq!(r.validated().unwrap_err().field(), "usage_limit");

        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.user_usage_limit = Some(0);
        assert_eq!(r.validated().unwrap_err().field(), "user_usage_limit");
    }

    #[test]
    fn counts_above_integer_range_are_rejected() {
        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.usage_limit = Some(u32::MAX);
        assert_eq!(r.validated().unwrap_err().field(), "usage_limit");

        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.minimum_items = Some(MAX_COUNT + 1);
        assert_eq!(r.validated().unwrap_err().field(), "minimum_items");

        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.user_usage_limit = Some(MAX_COUNT);
        assert!(r.validated().is_ok());
    }

    #[test]
    fn sub_cent_values_are_rejected() {
        let r = rules(DiscountType::Percentage, dec!(12.505));
        assert_eq!(r.validated().unwrap_err().field(), "discount_value");

        let r = rules(DiscountType::FixedAmount, dec!(5.001));
        assert_eq!(r.validated().unwrap_err().field(), "discount_value");

        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.maximum_discount = Some(Money::try_new(dec!(9.999)).unwrap());
        assert_eq!(r.validated().unwrap_err().field(), "maximum_discount");

        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.minimum_purchase = Some(Money::try_new(dec!(0.125)).unwrap());
        assert_eq!(r.validated().unwrap_err().field(), "minimum_purchase");

        // Trailing zeros are fine.
        let r = rules(DiscountType::FixedAmount, dec!(5.5000));
        assert!(r.validated().is_ok());
    }

    #[test]
    fn fixed_amount_above_money_range_is_rejected() {
        let r = rules(DiscountType::FixedAmount, dec!(10000000000));
        assert_eq!(r.validated().unwrap_err().field(), "discount_value");
    }

    #[test]
    fn window_must_be_forward() {
        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.valid_until = Some(r.valid_from);
        assert_eq!(r.validated().unwrap_err().field(), "valid_until");
    }

    #[test]
    fn validation_normalizes_scope_segments_and_name() {
        let mut r = rules(DiscountType::Percentage, dec!(10));
        r.scope = DiscountScope::Product(BTreeSet::new());
        r.customer_segments = [" VIP ".to_string(), "".to_string()].into_iter().collect();
        r.name = Some("   ".to_string());

        let r = r.validated().unwrap();
        assert_eq!(r.scope, DiscountScope::All);
        assert_eq!(r.customer_segments.len(), 1);
        assert!(r.customer_segments.contains("vip"));
        assert!(r.name.is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn create_starts_with_zero_usage() {
        let d = discount();
        assert_eq!(d.usage_count, 0);
        assert_eq!(d.code.as_str(), "SAVE20");
        assert_eq!(d.created_at, d.updated_at);
    }

    #[test]
    fn revise_keeps_usage_count() {
        let mut d = discount();
        d.usage_count = 7;
        let mut r = d.rules();
        r.discount_value = dec!(25);
        r.usage_limit = Some(100);

        d.revise(r, Timestamp::now().plus_secs(5)).unwrap();
        assert_eq!(d.usage_count, 7);
        assert_eq!(d.discount_value, dec!(25));
        assert!(d.updated_at.is_after(&d.created_at));
    }

    #[test]
    fn revise_cannot_drop_limit_below_usage_count() {
        let mut d = discount();
        d.usage_count = 2;

        for limit in [0, 1] {
            let mut r = d.rules();
            r.usage_limit = Some(limit);
            let err = d.revise(r, Timestamp::now()).unwrap_err();
            assert_eq!(err.field(), "usage_limit");
        }
        assert_eq!(d.usage_limit, None);

        let mut r = d.rules();
        r.usage_limit = Some(2);
        d.revise(r, Timestamp::now()).unwrap();
        assert_eq!(d.usage_limit, Some(2));
    }

    #[test]
    fn failed_revise_leaves_discount_untouched() {
        let mut d = discount();
        let before = d.clone();
        let mut r = d.rules();
        r.discount_value = dec!(500);
        assert!(d.revise(r, Timestamp::now()).is_err());
        assert_eq!(d, before);
    }

    #[test]
    fn toggle_flips_active_flag() {
        let mut d = discount();
        assert!(!d.toggle(Timestamp::now()));
        assert!(d.toggle(Timestamp::now()));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Queries
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn window_is_half_open() {
        let mut d = discount();
        let start = d.valid_from;
        d.valid_until = Some(start.add_days(1));
        assert!(d.is_within_window(&start));
        assert!(!d.is_within_window(&start.add_days(1)));
        assert!(!d.is_within_window(&start.plus_secs(-1)));
    }

    #[test]
    fn usage_exhausted_only_with_limit() {
        let mut d = discount();
        d.usage_count = 1_000;
        assert!(!d.usage_exhausted());
        d.usage_limit = Some(1_000);
        assert!(d.usage_exhausted());
    }

    #[test]
    fn login_required_for_per_user_restrictions() {
        let mut d = discount();
        assert!(!d.requires_login());

        d.user_usage_limit = Some(2);
        assert!(d.requires_login());
        d.user_usage_limit = None;

        d.first_purchase_only = true;
        assert!(d.requires_login());
        d.first_purchase_only = false;

        d.customer_segments.insert("vip".to_string());
        assert!(d.requires_login());
        d.customer_segments.clear();

        d.scope = DiscountScope::from_parts(ScopeKind::User, vec!["u1"]).unwrap();
        assert!(d.requires_login());
    }

    #[test]
    fn effective_user_limit_falls_back_to_policy() {
        let mut d = discount();
        let policy = DiscountPolicy::default();
        assert_eq!(d.effective_user_limit(&policy), Some(1));
        d.user_usage_limit = Some(3);
        assert_eq!(d.effective_user_limit(&policy), Some(3));
        let unlimited = DiscountPolicy {
            default_user_usage_limit: None,
        };
        d.user_usage_limit = None;
        assert_eq!(d.effective_user_limit(&unlimited), None);
    }

    #[test]
    fn targets_user_checks_user_scope_only() {
        let mut d = discount();
        let u1 = UserId::new("u1").unwrap();
        let u2 = UserId::new("u2").unwrap();
        assert!(d.targets_user(&u2));
        d.scope = DiscountScope::from_parts(ScopeKind::User, vec!["u1"]).unwrap();
        assert!(d.targets_user(&u1));
        assert!(!d.targets_user(&u2));
    }
}
