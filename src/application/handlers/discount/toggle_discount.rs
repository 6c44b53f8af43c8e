//! ToggleDiscountHandler - Command handler for switching a discount on or off.

use std::sync::Arc;
use tracing::info;

use crate::domain::discount::{Discount, DiscountError};
use crate::domain::foundation::{DiscountId, Timestamp};
use crate::ports::DiscountRepository;

#[derive(Debug, Clone)]
pub struct ToggleDiscountCommand {
    pub discount_id: DiscountId,
}

pub type ToggleDiscountResult = Discount;

pub struct ToggleDiscountHandler {
    repository: Arc<dyn DiscountRepository>,
}

impl ToggleDiscountHandler {
    pub fn new(repository: Arc<dyn DiscountRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: ToggleDiscountCommand) -> Result<ToggleDiscountResult, DiscountError> {
        let mut discount = self
            .repository
            .find_by_id(&cmd.discount_id)
            .await?
            .ok_or_else(|| DiscountError::not_found(cmd.discount_id))?;

        let active = discount.toggle(Timestamp::now());
        self.repository.update(&discount).await?;

        info!(discount_id = %discount.id, active, "Discount toggled");
        Ok(discount)
    }
}
