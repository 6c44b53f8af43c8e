//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `DiscountRepository` - Discount definitions by id and code
//! - `UsageLedger` - Atomic redemption and usage records
//!
//! ## Collaborator Ports
//!
//! - `CustomerReader` - Completed order count and segments per shopper

mod customer_reader;
mod discount_repository;
mod usage_ledger;

pub use customer_reader::CustomerReader;
pub use discount_repository::DiscountRepository;
pub use usage_ledger::UsageLedger;
