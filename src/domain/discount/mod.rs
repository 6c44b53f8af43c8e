//! Discount domain module.
//!
//! Decides whether promotional codes apply to a cart, how much they take off,
//! and which of several eligible discounts win.
//!
//! # Module Structure
//!
//! - `aggregate` - Discount aggregate and its editable rules
//! - `cart` - Read-only cart snapshot
//! - `scope` - Scope, exclusions and the scope resolver
//! - `eligibility` - Ordered eligibility checks
//! - `calculator` - Amount calculation
//! - `conflict` - Conflict resolution between candidates
//! - `usage` - Usage records, redemption and statistics
//! - `reason` - Stable reason keys

mod aggregate;
mod calculator;
mod cart;
mod code;
mod conflict;
mod discount_type;
mod eligibility;
mod errors;
mod policy;
mod reason;
mod scope;
mod shopper;
mod usage;

pub use aggregate::{Discount, DiscountRules};
pub use calculator::{AmountCalculator, DiscountAmount};
pub use cart::{CartLineItem, CartSnapshot};
pub use code::DiscountCode;
pub use conflict::{AppliedDiscount, AppliedDiscounts, Candidate, ConflictResolver};
pub use discount_type::DiscountType;
pub use eligibility::{Eligibility, EligibilityEvaluator, EvaluationContext};
pub use errors::DiscountError;
pub use policy::DiscountPolicy;
pub use reason::{DiscountReason, Ineligibility};
pub use scope::{DiscountScope, Exclusions, ScopeKind, ScopeMatch, ScopeResolver};
pub use shopper::{normalize_segments, ShopperProfile};
pub use usage::{DiscountUsageRecord, LimitKind, RedemptionOutcome, RedemptionRequest, UsageStatistics};
