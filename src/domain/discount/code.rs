//! Discount code value object.
//!
//! The human-entered token a shopper types at checkout.
//!
//! # Validation Rules
//!
//! - Surrounding whitespace is ignored
//! - Normalized to uppercase before storage and lookup
//! - 3-32 characters of `A-Z`, `0-9`, `-` or `_`

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 32;

/// A validated, case-normalized discount code.
///
/// Two codes that differ only in case are the same code.
///
/// # Example
///
/// ```ignore
/// let code = DiscountCode::try_new(" save20 ")?;
/// assert_eq!(code.as_str(), "SAVE20");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiscountCode(String);

impl DiscountCode {
    /// Creates a new DiscountCode from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - Code is empty (after trimming)
    /// - Code is shorter than 3 or longer than 32 characters
    /// - Code contains characters other than alphanumerics, `-` and `_`
    pub fn try_new(code: &str) -> Result<Self, ValidationError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }

        let normalized = trimmed.to_uppercase();

        let len = normalized.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(ValidationError::out_of_range(
                "code_length",
                MIN_LEN as i64,
                MAX_LEN as i64,
                len as i64,
            ));
        }

        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "code",
                "letters, digits, '-' and '_' only",
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DiscountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for DiscountCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl TryFrom<String> for DiscountCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(&value)
    }
}

impl From<DiscountCode> for String {
    fn from(code: DiscountCode) -> Self {
        code.0
    }
}
