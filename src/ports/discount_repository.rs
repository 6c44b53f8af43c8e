//! Discount repository port (write side and lookups).
//!
//! Discounts are looked up by id and by normalized code. Implementations
//! must enforce code uniqueness and must never write `usage_count` from
//! `save`/`update`; the counter belongs to [`UsageLedger`](super::UsageLedger).

use crate::domain::discount::{Discount, DiscountCode};
use crate::domain::foundation::{DiscountId, DomainError};
use async_trait::async_trait;

/// Repository port for Discount aggregate persistence.
#[async_trait]
pub trait DiscountRepository: Send + Sync {
    /// Save a new discount.
    ///
    /// # Errors
    ///
    /// - `DiscountCodeExists` if the code is taken (detail `code`)
    /// - `DatabaseError` on persistence failure
    async fn save(&self, discount: &Discount) -> Result<(), DomainError>;

    /// Update the editable rules of an existing discount.
    ///
    /// `usage_count` on the argument is ignored.
    ///
    /// # Errors
    ///
    /// - `DiscountNotFound` if the discount doesn't exist
    /// - `DiscountCodeExists` if the new code is taken by another discount
    /// - `DatabaseError` on persistence failure
    async fn update(&self, discount: &Discount) -> Result<(), DomainError>;

    /// Find a discount by id.
    async fn find_by_id(&self, id: &DiscountId) -> Result<Option<Discount>, DomainError>;

    /// Find a discount by its normalized code.
    async fn find_by_code(&self, code: &DiscountCode) -> Result<Option<Discount>, DomainError>;

    /// Active auto-apply discounts, highest priority first, at most `limit`.
    ///
    /// Validity windows and caps are not filtered here; the evaluator decides.
    async fn list_auto_apply(&self, limit: u32) -> Result<Vec<Discount>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn discount_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn DiscountRepository) {}
    }
}
