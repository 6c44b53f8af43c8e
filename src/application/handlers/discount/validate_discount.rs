//! ValidateDiscountHandler - Query handler for the live discount preview.
//!
//! Never fails: every outcome, including infrastructure trouble, is reported
//! as a reason key the storefront can localize.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::discount::{
    AmountCalculator, CartSnapshot, Discount, DiscountAmount, DiscountCode, DiscountReason,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::DiscountRepository;

use super::{Assessment, DiscountAssessor};

/// Query to validate an entered code against a cart.
#[derive(Debug, Clone)]
pub struct ValidateDiscountQuery {
    pub code: String,
    pub cart: CartSnapshot,
    pub user_id: Option<UserId>,
}

/// Outcome of a validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateDiscountResult {
    pub is_valid: bool,
    pub reason: DiscountReason,
    /// Present when the code is valid.
    pub discount: Option<Discount>,
    pub amount: Option<DiscountAmount>,
    /// Whole-number share of the subtotal taken off.
    pub discount_percentage: Option<Decimal>,
    /// Interpolation values for the reason message.
    pub details: BTreeMap<String, String>,
}

impl ValidateDiscountResult {
    fn rejected(reason: DiscountReason) -> Self {
        Self {
            is_valid: false,
            reason,
            discount: None,
            amount: None,
            discount_percentage: None,
            details: BTreeMap::new(),
        }
    }

    fn accepted(discount: Discount, amount: DiscountAmount, cart: &CartSnapshot) -> Self {
        Self {
            is_valid: true,
            reason: amount.reason(),
            discount_percentage: AmountCalculator::display_percentage(amount.merchandise, cart.subtotal()),
            discount: Some(discount),
            amount: Some(amount),
            details: BTreeMap::new(),
        }
    }
}

/// Handler for validating discount codes.
pub struct ValidateDiscountHandler {
    discounts: Arc<dyn DiscountRepository>,
    assessor: Arc<DiscountAssessor>,
}

impl ValidateDiscountHandler {
    pub fn new(discounts: Arc<dyn DiscountRepository>, assessor: Arc<DiscountAssessor>) -> Self {
        Self { discounts, assessor }
    }

    pub async fn handle(&self, query: ValidateDiscountQuery) -> ValidateDiscountResult {
        let raw = query.code.trim();
        if raw.is_empty() {
            return ValidateDiscountResult::rejected(DiscountReason::EnterDiscountCode);
        }

        // Malformed codes cannot exist in the store
        let code = match DiscountCode::try_new(raw) {
            Ok(code) => code,
            Err(_) => return ValidateDiscountResult::rejected(DiscountReason::InvalidCode),
        };

        match self.validate(&code, &query).await {
            Ok(result) => {
                debug!(code = %code, reason = %result.reason, "Discount validated");
                result
            }
            Err(err) => {
                error!(code = %code, error = %err, "Discount validation failed");
                ValidateDiscountResult::rejected(DiscountReason::FailedToValidate)
            }
        }
    }

    async fn validate(
        &self,
        code: &DiscountCode,
        query: &ValidateDiscountQuery,
    ) -> Result<ValidateDiscountResult, DomainError> {
        let Some(discount) = self.discounts.find_by_code(code).await? else {
            return Ok(ValidateDiscountResult::rejected(DiscountReason::InvalidCode));
        };

        let shopper = self.assessor.shopper(query.user_id.as_ref()).await?;
        let assessment = self
            .assessor
            .assess(&discount, &query.cart, shopper.as_ref(), Timestamp::now())
            .await?;

        Ok(match assessment {
            Assessment::Applicable(amount) => ValidateDiscountResult::accepted(discount, amount, &query.cart),
            Assessment::Rejected(cause) => {
                let mut result = ValidateDiscountResult::rejected(cause.reason());
                result.details = cause.details();
                result
            }
        })
    }
}
