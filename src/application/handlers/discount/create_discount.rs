//! CreateDiscountHandler - Command handler for adding a discount.

use std::sync::Arc;
use tracing::info;

use crate::domain::discount::{Discount, DiscountError, DiscountRules};
use crate::domain::foundation::{DiscountId, Timestamp};
use crate::ports::DiscountRepository;

#[derive(Debug, Clone)]
pub struct CreateDiscountCommand {
    pub rules: DiscountRules,
}

pub type CreateDiscountResult = Discount;

pub struct CreateDiscountHandler {
    repository: Arc<dyn DiscountRepository>,
}

impl CreateDiscountHandler {
    pub fn new(repository: Arc<dyn DiscountRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: CreateDiscountCommand) -> Result<CreateDiscountResult, DiscountError> {
        // 1. Reject duplicate codes up front; the store enforces it again
        if self.repository.find_by_code(&cmd.rules.code).await?.is_some() {
            return Err(DiscountError::code_exists(cmd.rules.code.as_str()));
        }

        // 2. Build and persist
        let discount = Discount::create(DiscountId::new(), cmd.rules, Timestamp::now())?;
        self.repository.save(&discount).await?;

        info!(
            discount_id = %discount.id,
            code = %discount.code,
            discount_type = %discount.discount_type,
            "Discount created"
        );
        Ok(discount)
    }
}
