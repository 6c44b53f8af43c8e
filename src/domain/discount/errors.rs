//! Discount-specific error types.
//!
//! Eligibility failures are not errors; they come back as
//! [`Ineligibility`](super::Ineligibility). These are the failures of
//! operations: lookups, admin edits, and redemption.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | CodeExists | 409 |
//! | InvalidCode | 400 |
//! | Ineligible | 422 |
//! | LimitExceeded | 409 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DiscountId, DomainError, ErrorCode, ValidationError};

use super::{DiscountReason, LimitKind};

/// Discount-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountError {
    /// No discount with this id.
    NotFound(DiscountId),

    /// Another discount already uses this code.
    CodeExists(String),

    /// The code is malformed or unknown.
    InvalidCode(String),

    /// The discount no longer applies to the order being confirmed.
    Ineligible {
        discount_id: DiscountId,
        reason: DiscountReason,
    },

    /// A usage cap was reached at redemption time.
    LimitExceeded {
        discount_id: DiscountId,
        limit: LimitKind,
    },

    /// Validation failed.
    ValidationFailed {
        field: String,
        message: String,
    },

    /// Infrastructure error.
    Infrastructure(String),
}

impl DiscountError {
    pub fn not_found(id: DiscountId) -> Self {
        DiscountError::NotFound(id)
    }

    pub fn code_exists(code: impl Into<String>) -> Self {
        DiscountError::CodeExists(code.into())
    }

    pub fn invalid_code(code: impl Into<String>) -> Self {
        DiscountError::InvalidCode(code.into())
    }

    pub fn ineligible(discount_id: DiscountId, reason: DiscountReason) -> Self {
        DiscountError::Ineligible { discount_id, reason }
    }

    pub fn limit_exceeded(discount_id: DiscountId, limit: LimitKind) -> Self {
        DiscountError::LimitExceeded { discount_id, limit }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DiscountError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        DiscountError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DiscountError::NotFound(_) => ErrorCode::DiscountNotFound,
            DiscountError::CodeExists(_) => ErrorCode::DiscountCodeExists,
            DiscountError::InvalidCode(_) => ErrorCode::ValidationFailed,
            DiscountError::Ineligible { .. } => ErrorCode::DiscountIneligible,
            DiscountError::LimitExceeded { .. } => ErrorCode::UsageLimitExceeded,
            DiscountError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            DiscountError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            DiscountError::NotFound(id) => format!("Discount not found: {}", id),
            DiscountError::CodeExists(code) => format!("Discount code '{}' already exists", code),
            DiscountError::InvalidCode(code) => format!("Invalid discount code: '{}'", code),
            DiscountError::Ineligible { discount_id, reason } => {
                format!("Discount {} no longer applies: {}", discount_id, reason)
            }
            DiscountError::LimitExceeded { discount_id, limit } => match limit {
                LimitKind::Global { limit } => {
                    format!("Discount {} reached its usage limit of {}", discount_id, limit)
                }
                LimitKind::PerUser { used, limit } => format!(
                    "Discount {} already used {} of {} times by this customer",
                    discount_id, used, limit
                ),
            },
            DiscountError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            DiscountError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// True if the caller should drop the discount and carry on with the order.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DiscountError::LimitExceeded { .. } | DiscountError::Ineligible { .. }
        )
    }
}

impl std::fmt::Display for DiscountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for DiscountError {}

impl From<DomainError> for DiscountError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DiscountCodeExists => DiscountError::CodeExists(
                err.details.get("code").cloned().unwrap_or_else(|| err.message.clone()),
            ),
            ErrorCode::ValidationFailed => DiscountError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => DiscountError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for DiscountError {
    fn from(err: ValidationError) -> Self {
        DiscountError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DiscountError> for DomainError {
    fn from(err: DiscountError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
