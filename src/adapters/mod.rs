//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - Process-local store for tests and development
//! - `postgres` - PostgreSQL persistence
//! - `http` - Axum REST surface

pub mod http;
pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCustomerReader, InMemoryDiscountStore};
pub use postgres::{PostgresCustomerReader, PostgresDiscountRepository, PostgresUsageLedger};
