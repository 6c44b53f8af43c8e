//! DiscountAssessor - shared evaluation step used by the discount handlers.
//!
//! Loads what evaluation needs from the ports (shopper profile, prior usage),
//! then runs the pure eligibility checks and amount calculation.

use futures::future::try_join_all;
use std::sync::Arc;

use crate::domain::discount::{
    AmountCalculator, CartSnapshot, Discount, DiscountAmount, DiscountPolicy, Eligibility,
    EligibilityEvaluator, EvaluationContext, Ineligibility, ShopperProfile,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{CustomerReader, UsageLedger};

/// Outcome of assessing one discount against a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    Applicable(DiscountAmount),
    Rejected(Ineligibility),
}

impl Assessment {
    pub fn amount(&self) -> Option<DiscountAmount> {
        match self {
            Assessment::Applicable(amount) => Some(*amount),
            Assessment::Rejected(_) => None,
        }
    }
}

pub struct DiscountAssessor {
    ledger: Arc<dyn UsageLedger>,
    customers: Arc<dyn CustomerReader>,
    evaluator: EligibilityEvaluator,
}

impl DiscountAssessor {
    pub fn new(
        ledger: Arc<dyn UsageLedger>,
        customers: Arc<dyn CustomerReader>,
        policy: DiscountPolicy,
    ) -> Self {
        Self {
            ledger,
            customers,
            evaluator: EligibilityEvaluator::new(policy),
        }
    }

    pub fn policy(&self) -> &DiscountPolicy {
        self.evaluator.policy()
    }

    /// Profile of an authenticated shopper; unknown customers get an empty profile.
    pub async fn shopper(&self, user_id: Option<&UserId>) -> Result<Option<ShopperProfile>, DomainError> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let profile = self
            .customers
            .find_profile(user_id)
            .await?
            .unwrap_or_else(|| ShopperProfile::new(user_id.clone()));
        Ok(Some(profile))
    }

    pub async fn assess(
        &self,
        discount: &Discount,
        cart: &CartSnapshot,
        shopper: Option<&ShopperProfile>,
        now: Timestamp,
    ) -> Result<Assessment, DomainError> {
        let user_usage = match shopper {
            Some(s) if discount.effective_user_limit(self.policy()).is_some() => {
                self.ledger.count_user_usage(&discount.id, &s.user_id).await?
            }
            _ => 0,
        };

        let ctx = EvaluationContext {
            cart,
            shopper,
            user_usage,
            now,
        };

        Ok(match self.evaluator.evaluate(discount, &ctx) {
            Eligibility::Eligible(matched) => Assessment::Applicable(AmountCalculator::calculate(
                discount,
                matched.eligible_subtotal,
                cart.shipping_total(),
            )),
            Eligibility::Ineligible(cause) => Assessment::Rejected(cause),
        })
    }

    /// Assesses several discounts, looking up usage counts concurrently.
    pub async fn assess_all(
        &self,
        discounts: &[Discount],
        cart: &CartSnapshot,
        shopper: Option<&ShopperProfile>,
        now: Timestamp,
    ) -> Result<Vec<Assessment>, DomainError> {
        try_join_all(discounts.iter().map(|d| self.assess(d, cart, shopper, now))).await
    }
}
