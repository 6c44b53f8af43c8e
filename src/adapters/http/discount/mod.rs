//! HTTP adapter for discount endpoints.
//!
//! Storefront:
//! - `POST /api/discounts/validate` - Validate an entered code
//! - `POST /api/discounts/auto-apply` - Best auto-apply discount
//! - `POST /api/discounts/resolve` - Final applied set
//! - `POST /api/discounts/redemptions` - Record usage
//!
//! Admin:
//! - `POST /api/admin/discounts` - Create
//! - `PUT /api/admin/discounts/:id` - Update
//! - `POST /api/admin/discounts/:id/toggle` - Toggle active
//! - `GET /api/admin/discounts/:id/stats` - Usage statistics

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{DiscountApiError, DiscountAppState, Shopper};
pub use routes::discount_router;
