//! In-memory adapters.
//!
//! Back the discount ports with process-local state for tests, demos and
//! single-node development. Not durable.
//!
//! ## Available Adapters
//!
//! - `InMemoryDiscountStore` - `DiscountRepository` + `UsageLedger`
//! - `InMemoryCustomerReader` - `CustomerReader` seeded with profiles

mod customer_reader;
mod discount_store;

pub use customer_reader::InMemoryCustomerReader;
pub use discount_store::InMemoryDiscountStore;
