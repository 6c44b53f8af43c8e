//! HTTP adapters - REST API implementations.

pub mod discount;

use axum::Router;

pub use discount::{discount_router, DiscountAppState};

/// The full API, rooted at `/api`, with state attached.
pub fn api_router(state: DiscountAppState) -> Router {
    Router::new()
        .nest("/api", discount_router())
        .with_state(state)
}
