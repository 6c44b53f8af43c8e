//! Axum router configuration for discount endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    create_discount, get_auto_apply_discount, get_discount_stats, record_usage,
    resolve_discounts, toggle_discount, update_discount, validate_discount, DiscountAppState,
};

/// Storefront routes, mounted at `/discounts`.
///
/// - `POST /validate` - Live preview of an entered code
/// - `POST /auto-apply` - Best auto-apply discount
/// - `POST /resolve` - Final applied discount set
/// - `POST /redemptions` - Record usage at order confirmation
pub fn discount_routes() -> Router<DiscountAppState> {
    Router::new()
        .route("/validate", post(validate_discount))
        .route("/auto-apply", post(get_auto_apply_discount))
        .route("/resolve", post(resolve_discounts))
        .route("/redemptions", post(record_usage))
}

/// Admin routes, mounted at `/admin/discounts`.
pub fn admin_discount_routes() -> Router<DiscountAppState> {
    Router::new()
        .route("/", post(create_discount))
        .route("/:id", put(update_discount))
        .route("/:id/toggle", post(toggle_discount))
        .route("/:id/stats", get(get_discount_stats))
}

/// The complete discount router, suitable for nesting under `/api`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", discount_router())
///     .with_state(state);
/// ```
pub fn discount_router() -> Router<DiscountAppState> {
    Router::new()
        .nest("/discounts", discount_routes())
        .nest("/admin/discounts", admin_discount_routes())
}
