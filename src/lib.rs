//! Storefront Discounts - Discount and pricing engine for checkout
//!
//! Validates discount codes against carts, picks auto-apply promotions,
//! resolves stacking conflicts, and records redemptions with atomic usage
//! limits.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
