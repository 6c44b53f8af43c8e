//! Eligibility evaluation.
//!
//! Runs the fixed sequence of checks that decides whether a discount may be
//! applied to a cart for a given shopper. The first failing check decides the
//! reason. Evaluation is pure; usage caps checked here are advisory and are
//! enforced again atomically when the order is confirmed.

use crate::domain::foundation::Timestamp;

use super::{
    CartSnapshot, Discount, DiscountPolicy, DiscountScope, Ineligibility, ScopeMatch,
    ScopeResolver, ShopperProfile,
};

/// Inputs that vary per evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub cart: &'a CartSnapshot,
    /// `None` for guest checkout.
    pub shopper: Option<&'a ShopperProfile>,
    /// The shopper's prior redemptions of this discount; 0 for guests.
    pub user_usage: u32,
    pub now: Timestamp,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(cart: &'a CartSnapshot, now: Timestamp) -> Self {
        Self {
            cart,
            shopper: None,
            user_usage: 0,
            now,
        }
    }

    pub fn with_shopper(mut self, shopper: &'a ShopperProfile, user_usage: u32) -> Self {
        self.shopper = Some(shopper);
        self.user_usage = user_usage;
        self
    }
}

/// Result of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible(ScopeMatch),
    Ineligible(Ineligibility),
}

/// Evaluates discounts against a cart under the store policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityEvaluator {
    policy: DiscountPolicy,
}

impl EligibilityEvaluator {
    pub fn new(policy: DiscountPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DiscountPolicy {
        &self.policy
    }

    pub fn evaluate(&self, discount: &Discount, ctx: &EvaluationContext<'_>) -> Eligibility {
        match self.check(discount, ctx) {
            Ok(matched) => Eligibility::Eligible(matched),
            Err(cause) => Eligibility::Ineligible(cause),
        }
    }

    fn check(&self, discount: &Discount, ctx: &EvaluationContext<'_>) -> Result<ScopeMatch, Ineligibility> {
        if !discount.is_active {
            return Err(Ineligibility::NotActive);
        }

        if !discount.is_within_window(&ctx.now) {
            return Err(Ineligibility::Expired);
        }

        if discount.usage_exhausted() {
            return Err(Ineligibility::UsageLimitReached);
        }

        if discount.requires_login() && ctx.shopper.is_none() {
            return Err(Ineligibility::LoginRequired);
        }

        if ctx.shopper.is_some() {
            if let Some(limit) = discount.effective_user_limit(&self.policy) {
                if ctx.user_usage >= limit {
                    return Err(Ineligibility::AlreadyUsed {
                        used: ctx.user_usage,
                        limit,
                    });
                }
            }
        }

        if discount.first_purchase_only {
            let completed = ctx.shopper.map_or(0, |s| s.completed_orders);
            if completed > 0 {
                return Err(Ineligibility::FirstTimeOnly);
            }
        }

        if let Some(required) = discount.minimum_purchase {
            let subtotal = ctx.cart.subtotal();
            if subtotal < required {
                return Err(Ineligibility::MinimumPurchase {
                    required,
                    shortfall: required.saturating_sub(subtotal),
                });
            }
        }

        if let Some(required) = discount.minimum_items {
            let current = u32::try_from(ctx.cart.line_count()).unwrap_or(u32::MAX);
            if current < required {
                return Err(Ineligibility::MinimumItems { required, current });
            }
        }

        let matched = ScopeResolver::resolve(&discount.scope, &discount.exclusions, ctx.cart);
        if matched.is_empty() {
            return Err(Ineligibility::NotApplicable {
                scope: discount.scope_kind(),
            });
        }

        if !customer_targeted(discount, ctx.shopper) {
            return Err(Ineligibility::CustomerMismatch {
                scope: discount.scope_kind(),
            });
        }

        Ok(matched)
    }
}

fn customer_targeted(discount: &Discount, shopper: Option<&ShopperProfile>) -> bool {
    let restricted_to_users = matches!(discount.scope, DiscountScope::User(_));
    if discount.customer_segments.is_empty() && !restricted_to_users {
        return true;
    }
    let Some(shopper) = shopper else {
        return false;
    };
    (discount.customer_segments.is_empty() || shopper.in_any_segment(&discount.customer_segments))
        && discount.targets_user(&shopper.user_id)
}
