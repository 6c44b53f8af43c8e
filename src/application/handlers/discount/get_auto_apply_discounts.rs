//! GetAutoApplyDiscountsHandler - Query handler for the best automatic discount.

use std::sync::Arc;
use tracing::debug;

use crate::domain::discount::{
    CartSnapshot, Candidate, ConflictResolver, Discount, DiscountAmount, DiscountError,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::DiscountRepository;

use super::{Assessment, DiscountAssessor};

/// Query for the best auto-apply discount for a cart.
#[derive(Debug, Clone)]
pub struct GetAutoApplyDiscountsQuery {
    pub user_id: Option<UserId>,
    pub cart: CartSnapshot,
}

/// The winning auto-apply discount and what it takes off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoApplyDiscount {
    pub discount: Discount,
    pub amount: DiscountAmount,
}

pub type GetAutoApplyDiscountsResult = Option<AutoApplyDiscount>;

pub struct GetAutoApplyDiscountsHandler {
    discounts: Arc<dyn DiscountRepository>,
    assessor: Arc<DiscountAssessor>,
    max_candidates: u32,
}

impl GetAutoApplyDiscountsHandler {
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

    pub async fn handle(
        &self,
        query: GetAutoApplyDiscountsQuery,
    ) -> Result<GetAutoApplyDiscountsResult, DiscountError> {
        let discounts = self.discounts.list_auto_apply(self.max_candidates).await?;
        if discounts.is_empty() {
            return Ok(None);
        }

        let shopper = self.assessor.shopper(query.user_id.as_ref()).await?;
        let assessments = self
            .assessor
            .assess_all(&discounts, &query.cart, shopper.as_ref(), Timestamp::now())
            .await?;

        let candidates: Vec<Candidate> = discounts
            .iter()
            .zip(&assessments)
            .filter_map(|(discount, assessment)| match assessment {
                Assessment::Applicable(amount) => Some(Candidate::new(discount, *amount)),
                Assessment::Rejected(_) => None,
            })
            .collect();

        debug!(
            listed = discounts.len(),
            eligible = candidates.len(),
            "Auto-apply candidates assessed"
        );

        let Some(best) = ConflictResolver::best(candidates) else {
            return Ok(None);
        };

        Ok(discounts
            .into_iter()
            .find(|d| d.id == best.discount_id)
            .map(|discount| AutoApplyDiscount {
                discount,
                amount: best.amount,
            }))
    }
}
