//! Discount handlers.
//!
//! ## Queries
//! - Validate an entered code (live preview)
//! - Best auto-apply discount for a cart
//! - Resolve the final applied discount set
//! - Usage statistics (admin)
//!
//! ## Commands
//! - Record usage at order confirmation
//! - Create, update and toggle discounts (admin)

mod assessor;
mod create_discount;
mod get_auto_apply_discounts;
mod get_discount_stats;
mod record_discount_usage;
mod resolve_discounts;
mod toggle_discount;
mod update_discount;
mod validate_discount;

#[cfg(test)]
mod fixtures;

pub use assessor::{Assessment, DiscountAssessor};

// Commands
pub use create_discount::{CreateDiscountCommand, CreateDiscountHandler, CreateDiscountResult};
pub use record_discount_usage::{
    RecordDiscountUsageCommand, RecordDiscountUsageHandler, RecordDiscountUsageResult,
};
pub use toggle_discount::{ToggleDiscountCommand, ToggleDiscountHandler, ToggleDiscountResult};
pub use update_discount::{UpdateDiscountCommand, UpdateDiscountHandler, UpdateDiscountResult};

// Queries
pub use get_auto_apply_discounts::{
    AutoApplyDiscount, GetAutoApplyDiscountsHandler, GetAutoApplyDiscountsQuery,
    GetAutoApplyDiscountsResult,
};
pub use get_discount_stats::{GetDiscountStatsHandler, GetDiscountStatsQuery, GetDiscountStatsResult};
pub use resolve_discounts::{ResolveDiscountsHandler, ResolveDiscountsQuery, ResolveDiscountsResult};
pub use validate_discount::{ValidateDiscountHandler, ValidateDiscountQuery, ValidateDiscountResult};
