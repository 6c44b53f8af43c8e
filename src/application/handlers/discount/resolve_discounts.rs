//! ResolveDiscountsHandler - Query handler for the final applied discount set.
//!
//! Combines an optional entered code with every eligible auto-apply discount
//! and hands them to the conflict resolver.

use std::sync::Arc;
use tracing::debug;

use crate::domain::discount::{
    AppliedDiscounts, Candidate, CartSnapshot, ConflictResolver, DiscountCode, DiscountError,
    DiscountReason, ShopperProfile,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::DiscountRepository;

use super::{Assessment, DiscountAssessor};

#[derive(Debug, Clone)]
pub struct ResolveDiscountsQuery {
    /// Code the shopper entered, if any.
    pub code: Option<String>,
    pub user_id: Option<UserId>,
    pub cart: CartSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveDiscountsResult {
    pub applied: AppliedDiscounts,
    /// Why the entered code was left out, if it was.
    pub code_rejection: Option<DiscountReason>,
}

pub struct ResolveDiscountsHandler {
    discounts: Arc<dyn DiscountRepository>,
    assessor: Arc<DiscountAssessor>,
    max_candidates: u32,
}

impl ResolveDiscountsHandler {
    pub fn new(
        discounts: Arc<dyn DiscountRepository>,
        assessor: Arc<DiscountAssessor>,
        max_candidates: u32,
    ) -> Self {
        Self {
            discounts,
            assessor,
            max_candidates,
        }
    }

    pub async fn handle(&self, query: ResolveDiscountsQuery) -> Result<ResolveDiscountsResult, DiscountError> {
        let now = Timestamp::now();
        let shopper = self.assessor.shopper(query.user_id.as_ref()).await?;

        let (explicit, code_rejection) = match query.code.as_deref().map(str::trim) {
            None | Some("") => (None, None),
            Some(raw) => self.explicit_candidate(raw, &query.cart, shopper.as_ref(), now).await?,
        };

        let autos = self.discounts.list_auto_apply(self.max_candidates).await?;
        let assessments = self
            .assessor
            .assess_all(&autos, &query.cart, shopper.as_ref(), now)
            .await?;
        let auto: Vec<Candidate> = autos
            .iter()
            .zip(&assessments)
            .filter_map(|(discount, assessment)| {
                assessment.amount().map(|amount| Candidate::new(discount, amount))
            })
            .collect();

        let applied = ConflictResolver::resolve(
            explicit,
            auto,
            query.cart.subtotal(),
            query.cart.shipping_total(),
        );

        debug!(
            applied = applied.applied.len(),
            total_discount = %applied.total_discount,
            "Discounts resolved"
        );

        Ok(ResolveDiscountsResult {
            applied,
            code_rejection,
        })
    }

    async fn explicit_candidate(
        &self,
        raw: &str,
        cart: &CartSnapshot,
        shopper: Option<&ShopperProfile>,
        now: Timestamp,
    ) -> Result<(Option<Candidate>, Option<DiscountReason>), DiscountError> {
        let Ok(code) = DiscountCode::try_new(raw) else {
            return Ok((None, Some(DiscountReason::InvalidCode)));
        };
        let Some(discount) = self.discounts.find_by_code(&code).await? else {
            return Ok((None, Some(DiscountReason::InvalidCode)));
        };

        Ok(match self.assessor.assess(&discount, cart, shopper, now).await? {
            Assessment::Applicable(amount) => (Some(Candidate::new(&discount, amount)), None),
            Assessment::Rejected(cause) => (None, Some(cause.reason())),
        })
    }
}
