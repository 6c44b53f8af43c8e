//! Customer reader port.
//!
//! Read-only access to the facts the discount engine needs about a shopper:
//! completed order count and segment tags. Owned by the customer/order
//! subsystems; the engine never writes through it.

use crate::domain::discount::ShopperProfile;
use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait CustomerReader: Send + Sync {
    /// Profile for `user_id`, or `None` if the customer is unknown.
    ///
    /// Callers treat `None` as a shopper with no orders and no segments.
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<ShopperProfile>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_reader_is_object_safe() {
        fn _accepts_dyn(_reader: &dyn CustomerReader) {}
    }
}
