//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the discount domain.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CategoryId, DiscountId, OrderId, ProductId, UsageRecordId, UserId, VariantId};
pub use money::{Money, CURRENCY_SCALE};
pub use timestamp::Timestamp;
