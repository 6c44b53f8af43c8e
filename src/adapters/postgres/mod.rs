//! PostgreSQL adapters - Database implementations for the discount ports.
//!
//! - `PostgresDiscountRepository` - Discount definitions
//! - `PostgresUsageLedger` - Atomic redemption and usage statistics
//! - `PostgresCustomerReader` - Shopper facts for eligibility

mod customer_reader;
mod discount_repository;
mod usage_ledger;

pub use customer_reader::PostgresCustomerReader;
pub use discount_repository::PostgresDiscountRepository;
pub use usage_ledger::PostgresUsageLedger;
