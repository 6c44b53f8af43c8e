//! Stable reason keys and structured ineligibility causes.
//!
//! Reason keys are the only thing shown to shoppers; the caller localizes them.
//! The set is closed so nothing free-form escapes the public interface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::Money;

use super::ScopeKind;

/// Localizable outcome key returned by discount validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscountReason {
    InvalidCode,
    NotActive,
    Expired,
    UsageLimitReached,
    AlreadyUsed,
    LoginRequired,
    FirstTimeOnly,
    MinimumPurchase,
    MinimumItems,
    NotApplicableProducts,
    NotApplicableVariants,
    NotApplicableCategories,
    DiscountAppliedCapped,
    DiscountAppliedSuccess,
    EnterDiscountCode,
    FailedToValidate,
}

impl DiscountReason {
    /// Every key, in declaration order.
    pub const ALL: [DiscountReason; 16] = [
        DiscountReason::InvalidCode,
        DiscountReason::NotActive,
        DiscountReason::Expired,
        DiscountReason::UsageLimitReached,
        DiscountReason::AlreadyUsed,
        DiscountReason::LoginRequired,
        DiscountReason::FirstTimeOnly,
        DiscountReason::MinimumPurchase,
        DiscountReason::MinimumItems,
        DiscountReason::NotApplicableProducts,
        DiscountReason::NotApplicableVariants,
        DiscountReason::NotApplicableCategories,
        DiscountReason::DiscountAppliedCapped,
        DiscountReason::DiscountAppliedSuccess,
        DiscountReason::EnterDiscountCode,
        DiscountReason::FailedToValidate,
    ];

    /// The wire key, e.g. `"notApplicableCategories"`.
    pub fn key(&self) -> &'static str {
        match self {
            DiscountReason::InvalidCode => "invalidCode",
            DiscountReason::NotActive => "notActive",
            DiscountReason::Expired => "expired",
            DiscountReason::UsageLimitReached => "usageLimitReached",
            DiscountReason::AlreadyUsed => "alreadyUsed",
            DiscountReason::LoginRequired => "loginRequired",
            DiscountReason::FirstTimeOnly => "firstTimeOnly",
            DiscountReason::MinimumPurchase => "minimumPurchase",
            DiscountReason::MinimumItems => "minimumItems",
            DiscountReason::NotApplicableProducts => "notApplicableProducts",
            DiscountReason::NotApplicableVariants => "notApplicableVariants",
            DiscountReason::NotApplicableCategories => "notApplicableCategories",
            DiscountReason::DiscountAppliedCapped => "discountAppliedCapped",
            DiscountReason::DiscountAppliedSuccess => "discountAppliedSuccess",
            DiscountReason::EnterDiscountCode => "enterDiscountCode",
            DiscountReason::FailedToValidate => "failedToValidate",
        }
    }

    /// Scope-style mismatch key for a scope kind.
    pub fn not_applicable_for(kind: ScopeKind) -> Self {
        match kind {
            ScopeKind::Variant => DiscountReason::NotApplicableVariants,
            ScopeKind::Category => DiscountReason::NotApplicableCategories,
            ScopeKind::Product | ScopeKind::All | ScopeKind::User => {
                DiscountReason::NotApplicableProducts
            }
        }
    }
}

impl fmt::Display for DiscountReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Why a discount cannot be applied, with the figures the shopper needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    NotActive,
    /// Outside `[valid_from, valid_until)`; covers not-yet-started too.
    Expired,
    UsageLimitReached,
    LoginRequired,
    AlreadyUsed { used: u32, limit: u32 },
    FirstTimeOnly,
    /// `shortfall` is how much more the cart needs to qualify.
    MinimumPurchase { required: Money, shortfall: Money },
    MinimumItems { required: u32, current: u32 },
    /// No line item falls inside the discount's scope.
    NotApplicable { scope: ScopeKind },
    /// The shopper is not among the targeted users or segments.
    CustomerMismatch { scope: ScopeKind },
}

impl Ineligibility {
    pub fn reason(&self) -> DiscountReason {
        match self {
            Ineligibility::NotActive => DiscountReason::NotActive,
            Ineligibility::Expired => DiscountReason::Expired,
            Ineligibility::UsageLimitReached => DiscountReason::UsageLimitReached,
            Ineligibility::LoginRequired => DiscountReason::LoginRequired,
            Ineligibility::AlreadyUsed { .. } => DiscountReason::AlreadyUsed,
            Ineligibility::FirstTimeOnly => DiscountReason::FirstTimeOnly,
            Ineligibility::MinimumPurchase { .. } => DiscountReason::MinimumPurchase,
            Ineligibility::MinimumItems { .. } => DiscountReason::MinimumItems,
            Ineligibility::NotApplicable { scope } | Ineligibility::CustomerMismatch { scope } => {
                DiscountReason::not_applicable_for(*scope)
            }
        }
    }

    /// Interpolation values for the localized message.
    pub fn details(&self) -> BTreeMap<String, String> {
        let mut details = BTreeMap::new();
        match self {
            Ineligibility::AlreadyUsed { used, limit } => {
                details.insert("used".to_string(), used.to_string());
                details.insert("limit".to_string(), limit.to_string());
            }
            Ineligibility::MinimumPurchase { required, shortfall } => {
                details.insert("required".to_string(), required.to_string());
                details.insert("shortfall".to_string(), shortfall.to_string());
            }
            Ineligibility::MinimumItems { required, current } => {
                details.insert("required".to_string(), required.to_string());
                details.insert("current".to_string(), current.to_string());
            }
            _ => {}
        }
        details
    }
}
