//! UpdateDiscountHandler - Command handler for editing a discount's rules.
//!
//! Replaces every editable field. The usage counter is left to the ledger.

use std::sync::Arc;
use tracing::info;

use crate::domain::discount::{Discount, DiscountError, DiscountRules};
use crate::domain::foundation::{DiscountId, Timestamp};
use crate::ports::DiscountRepository;

#[derive(Debug, Clone)]
pub struct UpdateDiscountCommand {
    pub discount_id: DiscountId,
    pub rules: DiscountRules,
}

pub type UpdateDiscountResult = Discount;

pub struct UpdateDiscountHandler {
    repository: Arc<dyn DiscountRepository>,
}

impl UpdateDiscountHandler {
    pub fn new(repository: Arc<dyn DiscountRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: UpdateDiscountCommand) -> Result<UpdateDiscountResult, DiscountError> {
        let mut discount = self
            .repository
            .find_by_id(&cmd.discount_id)
            .await?
            .ok_or_else(|| DiscountError::not_found(cmd.discount_id))?;

        if cmd.rules.code != discount.code {
            if let Some(other) = self.repository.find_by_code(&cmd.rules.code).await? {
                if other.id != discount.id {
                    return Err(DiscountError::code_exists(cmd.rules.code.as_str()));
                }
            }
        }

        discount.revise(cmd.rules, Timestamp::now())?;
        self.repository.update(&discount).await?;

        info!(discount_id = %discount.id, code = %discount.code, "Discount updated");
        Ok(discount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDiscountStore;
    use crate::application::handlers::discount::fixtures::*;
    use crate::domain::discount::DiscountType;
    use crate::ports::DiscountRepository;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn updates_rules_and_keeps_usage() {
        let store = Arc::new(InMemoryDiscountStore::new());
        let d = seed(&store, rules("SPRING", DiscountType::Percentage, dec!(15))).await;
        redeem_for(&store, &d, None, "o-1").await;

        let mut edited = d.rules();
        edited.discount_value = dec!(25);
        edited.code = code("SPRING25");
        let updated = UpdateDiscountHandler::new(store.clone())
            .handle(UpdateDiscountCommand {
                discount_id: d.id,
                rules: edited,
            })
            .await
            .unwrap();

        assert_eq!(updated.code.as_str(), "SPRING25");
        let stored = store.find_by_id(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.discount_value, dec!(25));
        assert_eq!(stored.usage_count, 1);
    }

    #[tokio::test]
    async fn rejects_code_taken_by_another_discount() {
        let store = Arc::new(InMemoryDiscountStore::new());
        let d = seed(&store, rules("SPRING", DiscountType::Percentage, dec!(15))).await;
        seed(&store, rules("SUMMER", DiscountType::Percentage, dec!(10))).await;

        let mut edited = d.rules();
        edited.code = code("SUMMER");
        let result = UpdateDiscountHandler::new(store)
            .handle(UpdateDiscountCommand {
                discount_id: d.id,
                rules: edited,
            })
            .await;
        assert_eq!(result.unwrap_err(), DiscountError::code_exists("SUMMER"));
    }

    #[tokio::test]
    async fn rejects_usage_limit_below_recorded_usage() {
        let store = Arc::new(InMemoryDiscountStore::new());
        let d = seed(&store, rules("SPRING", DiscountType::Percentage, dec!(15))).await;
        redeem_for(&store, &d, None, "o-1").await;
        redeem_for(&store, &d, None, "o-2").await;
        let handler = UpdateDiscountHandler::new(store.clone());

        for limit in [0, 1] {
            let mut edited = d.rules();
            edited.usage_limit = Some(limit);
            let err = handler
                .handle(UpdateDiscountCommand {
                    discount_id: d.id,
                    rules: edited,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(&err, DiscountError::ValidationFailed { field, .. } if field == "usage_limit"),
                "limit {} gave {:?}",
                limit,
                err
            );
        }
        let stored = store.find_by_id(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.usage_limit, None);

        let mut edited = d.rules();
        edited.usage_limit = Some(2);
        let updated = handler
            .handle(UpdateDiscountCommand {
                discount_id: d.id,
                rules: edited,
            })
            .await
            .unwrap();
        assert_eq!(updated.usage_limit, Some(2));
        assert_eq!(updated.usage_count, 2);
    }

    #[tokio::test]
    async fn unknown_discount_is_not_found() {
        let store = Arc::new(InMemoryDiscountStore::new());
        let id = DiscountId::new();
        let result = UpdateDiscountHandler::new(store)
            .handle(UpdateDiscountCommand {
                discount_id: id,
                rules: rules("SPRING", DiscountType::Percentage, dec!(15)),
            })
            .await;
        assert_eq!(result.unwrap_err(), DiscountError::not_found(id));
    }
}
