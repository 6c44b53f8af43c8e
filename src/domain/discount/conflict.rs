//! Conflict resolution between eligible discounts.
//!
//! Picks the final set of discounts for a cart. An explicitly entered code is
//! considered first; auto-apply discounts fill in around it according to their
//! stacking flags. Stacked amounts are additive, each computed against the
//! original subtotal.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::foundation::{DiscountId, Money};

use super::{Discount, DiscountAmount, DiscountCode, DiscountType, ScopeKind};

/// An eligible discount together with its computed amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub discount_id: DiscountId,
    pub code: DiscountCode,
    pub discount_type: DiscountType,
    pub priority: i32,
    pub scope_kind: ScopeKind,
    pub stackable: bool,
    pub amount: DiscountAmount,
}

impl Candidate {
    pub fn new(discount: &Discount, amount: DiscountAmount) -> Self {
        Self {
            discount_id: discount.id,
            code: discount.code.clone(),
            discount_type: discount.discount_type,
            priority: discount.priority,
            scope_kind: discount.scope_kind(),
            stackable: discount.stackable,
            amount,
        }
    }

    /// Ranking used when several auto-apply discounts compete: priority,
    /// then scope specificity, then amount, then code for determinism.
    pub fn rank(&self, other: &Candidate) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.scope_kind.specificity().cmp(&self.scope_kind.specificity()))
            .then_with(|| other.amount.total().cmp(&self.amount.total()))
            .then_with(|| self.code.cmp(&other.code))
    }
}

/// One discount in the final applied set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub discount_id: DiscountId,
    pub code: DiscountCode,
    pub discount_type: DiscountType,
    pub amount_off: Money,
    pub shipping_waived: Money,
    pub capped: bool,
    /// True for the code the shopper entered.
    pub explicit: bool,
}

impl AppliedDiscount {
    fn from_candidate(candidate: Candidate, explicit: bool) -> Self {
        Self {
            discount_id: candidate.discount_id,
            code: candidate.code,
            discount_type: candidate.discount_type,
            amount_off: candidate.amount.merchandise,
            shipping_waived: candidate.amount.shipping_waived,
            capped: candidate.amount.capped,
            explicit,
        }
    }
}

/// Ordered applied discounts and their aggregate effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscounts {
    pub applied: Vec<AppliedDiscount>,
    /// Sum of merchandise reductions, never more than the cart subtotal.
    pub total_discount: Money,
    /// Sum of shipping waivers, never more than the shipping charge.
    pub total_shipping_waived: Money,
}

impl AppliedDiscounts {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Totals are clamped to what the cart can give up. When stacking would
    /// exceed that, the excess is taken back from the last-applied entries so
    /// the per-entry amounts still add up to the totals.
    fn from_applied(mut applied: Vec<AppliedDiscount>, cart_subtotal: Money, shipping_total: Money) -> Self {
        let total_discount = trim_to_limit(&mut applied, cart_subtotal, |a| &mut a.amount_off);
        let total_shipping_waived =
            trim_to_limit(&mut applied, shipping_total, |a| &mut a.shipping_waived);
        Self {
            applied,
            total_discount,
            total_shipping_waived,
        }
    }
}

fn trim_to_limit(
    applied: &mut [AppliedDiscount],
    limit: Money,
    field: impl Fn(&mut AppliedDiscount) -> &mut Money,
) -> Money {
    let total: Money = applied.iter_mut().map(|a| *field(a)).sum();
    let mut excess = total.saturating_sub(limit);
    for entry in applied.iter_mut().rev() {
        if excess.is_zero() {
            break;
        }
        let amount = field(entry);
        let taken = excess.min(*amount);
        *amount = amount.saturating_sub(taken);
        excess = excess.saturating_sub(taken);
        entry.capped = true;
    }
    total.min(limit)
}

pub struct ConflictResolver;

impl ConflictResolver {
    /// Chooses the applied set.
    ///
    /// `explicit` is the entered code if it passed eligibility; `auto` holds
    /// every eligible auto-apply discount. The explicit discount is ignored if
    /// it also appears in `auto`.
    pub fn resolve(
        explicit: Option<Candidate>,
        auto: Vec<Candidate>,
        cart_subtotal: Money,
        shipping_total: Money,
    ) -> AppliedDiscounts {
        let mut auto: Vec<Candidate> = match &explicit {
            Some(entered) => auto
                .into_iter()
                .filter(|c| c.discount_id != entered.discount_id)
                .collect(),
            None => auto,
        };
        auto.sort_by(Candidate::rank);

        let applied = match explicit {
            Some(entered) if !entered.stackable => {
                vec![AppliedDiscount::from_candidate(entered, true)]
            }
            Some(entered) => {
                let mut applied = vec![AppliedDiscount::from_candidate(entered, true)];
                applied.extend(
                    auto.into_iter()
                        .filter(|c| c.stackable)
                        .map(|c| AppliedDiscount::from_candidate(c, false)),
                );
                applied
            }
            None => {
                let mut ranked = auto.into_iter();
                match ranked.next() {
                    Some(best) if best.stackable => {
                        let mut applied = vec![AppliedDiscount::from_candidate(best, false)];
                        applied.extend(
                            ranked
                                .filter(|c| c.stackable)
                                .map(|c| AppliedDiscount::from_candidate(c, false)),
                        );
                        applied
                    }
                    Some(best) => vec![AppliedDiscount::from_candidate(best, false)],
                    None => Vec::new(),
                }
            }
        };

        AppliedDiscounts::from_applied(applied, cart_subtotal, shipping_total)
    }

    /// Best single auto-apply candidate, by the same ranking as [`ConflictResolver::resolve`].
    pub fn best(auto: Vec<Candidate>) -> Option<Candidate> {
        auto.into_iter().min_by(Candidate::rank)
    }
}
