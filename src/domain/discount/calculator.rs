//! Amount calculation.
//!
//! Computes how much a discount takes off its eligible subtotal, or how much
//! shipping it waives. Rounding to currency precision happens once, on the
//! final figure.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Money;

use super::{Discount, DiscountReason, DiscountType};

/// The reduction produced by one discount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountAmount {
    /// Taken off the merchandise subtotal.
    pub merchandise: Money,
    /// Taken off the shipping charge.
    pub shipping_waived: Money,
    /// True if `maximum_discount` reduced the figure.
    pub capped: bool,
}

impl DiscountAmount {
    /// Merchandise plus shipping reduction.
    pub fn total(&self) -> Money {
        self.merchandise + self.shipping_waived
    }

    /// Success reason key for a discount that applied.
    pub fn reason(&self) -> DiscountReason {
        if self.capped {
            DiscountReason::DiscountAppliedCapped
        } else {
            DiscountReason::DiscountAppliedSuccess
        }
    }
}

pub struct AmountCalculator;

impl AmountCalculator {
    /// Computes the reduction for `discount` given the subtotal of the lines it
    /// matched and the cart's shipping charge.
    pub fn calculate(discount: &Discount, eligible_subtotal: Money, shipping_total: Money) -> DiscountAmount {
        match discount.discount_type {
            DiscountType::Percentage => {
                let raw = Money::saturating(
                    eligible_subtotal.amount().saturating_mul(discount.discount_value)
                        / Decimal::ONE_HUNDRED,
                );
                let (amount, capped) = apply_cap(raw, discount.maximum_discount);
                DiscountAmount {
                    merchandise: amount.rounded().min(eligible_subtotal),
                    shipping_waived: Money::ZERO,
                    capped,
                }
            }
            DiscountType::FixedAmount => {
                let raw = Money::saturating(discount.discount_value).min(eligible_subtotal);
                let (amount, capped) = apply_cap(raw, discount.maximum_discount);
                DiscountAmount {
                    merchandise: amount.rounded().min(eligible_subtotal),
                    shipping_waived: Money::ZERO,
                    capped,
                }
            }
            DiscountType::FreeShipping => {
                let (amount, capped) = apply_cap(shipping_total, discount.maximum_discount);
                DiscountAmount {
                    merchandise: Money::ZERO,
                    shipping_waived: amount.rounded().min(shipping_total),
                    capped,
                }
            }
        }
    }

    /// Whole-number percentage of the cart subtotal that `amount_off` represents.
    ///
    /// Derived from the actual (possibly capped) amount. `None` for an empty cart.
    pub fn display_percentage(amount_off: Money, cart_subtotal: Money) -> Option<Decimal> {
        if cart_subtotal.is_zero() {
            return None;
        }
        let pct = amount_off.amount() / cart_subtotal.amount() * Decimal::ONE_HUNDRED;
        Some(pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }
}

fn apply_cap(amount: Money, cap: Option<Money>) -> (Money, bool) {
    match cap {
        Some(cap) if amount > cap => (cap, true),
        _ => (amount, false),
    }
}
