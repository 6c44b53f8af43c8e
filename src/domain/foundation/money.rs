//! Money value object (non-negative currency amount).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use super::ValidationError;

/// Number of decimal places used for currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount in cents, matching the `NUMERIC(12, 2)` columns.
const MAX_CENTS: i64 = 999_999_999_999;

/// A non-negative monetary amount in the store currency, at most
/// [`Money::max_value`].
///
/// Arithmetic keeps full precision; call [`Money::rounded`] once on the final
/// figure so intermediate steps never compound rounding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest representable amount, 9 999 999 999.99.
    pub fn max_value() -> Self {
        Self(Decimal::new(MAX_CENTS, CURRENCY_SCALE))
    }

    /// Creates a Money value, returning error if negative or above [`Money::max_value`].
    pub fn try_new(amount: Decimal) -> Result<Self, ValidationError> {
        Self::try_new_for("amount", amount)
    }

    /// Like [`Money::try_new`], naming the offending field in the error.
    pub fn try_new_for(field: &str, amount: Decimal) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::negative(field));
        }
        let max = Self::max_value();
        if amount > max.0 {
            return Err(ValidationError::invalid_format(
                field,
                format!("must not exceed {}", max),
            ));
        }
        Ok(Self(amount))
    }

    /// Creates a Money value, clamping into `[0, max_value]`.
    pub fn saturating(amount: Decimal) -> Self {
        Self(amount.max(Decimal::ZERO).min(Self::max_value().0))
    }

    /// Adds, returning `None` above [`Money::max_value`].
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0
            .checked_add(other.0)
            .filter(|sum| *sum <= Self::max_value().0)
            .map(Self)
    }

    /// Returns the raw decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Rounds to currency precision (2 dp, midpoint away from zero).
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Returns the smaller of two amounts.
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Subtracts, flooring at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        Self::saturating(self.0 - other.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Money {
    type Output = Money;

    /// Saturates at [`Money::max_value`].
    fn add(self, rhs: Money) -> Money {
        Self::saturating(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
