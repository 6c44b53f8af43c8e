//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `discount` - Discount rules, eligibility, amounts and conflict resolution

pub mod discount;
pub mod foundation;
