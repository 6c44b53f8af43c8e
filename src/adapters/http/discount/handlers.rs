//! HTTP handlers for discount endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Json, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{debug, error};

use crate::application::handlers::discount::{
    CreateDiscountCommand, CreateDiscountHandler, DiscountAssessor, GetAutoApplyDiscountsHandler,
    GetAutoApplyDiscountsQuery, GetDiscountStatsHandler, GetDiscountStatsQuery,
    RecordDiscountUsageCommand, RecordDiscountUsageHandler, ResolveDiscountsHandler,
    ResolveDiscountsQuery, ToggleDiscountCommand, ToggleDiscountHandler, UpdateDiscountCommand,
    UpdateDiscountHandler, ValidateDiscountHandler, ValidateDiscountQuery,
};
use crate::domain::discount::{CartSnapshot, DiscountError, DiscountPolicy, LimitKind};
use crate::domain::foundation::{DiscountId, DomainError, Timestamp, UserId};
use crate::ports::{CustomerReader, DiscountRepository, UsageLedger};

use super::dto::{
    cart_from_request, AutoApplyRequest, AutoApplyResponse, DiscountResponse,
    DiscountRulesRequest, DiscountStatsResponse, ErrorResponse, RecordUsageRequest,
    RedemptionResponse, ResolveDiscountsRequest, ResolveDiscountsResponse,
    ValidateDiscountRequest, ValidateDiscountResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the discount router. Cloned per request.
#[derive(Clone)]
pub struct DiscountAppState {
    pub discount_repository: Arc<dyn DiscountRepository>,
    pub usage_ledger: Arc<dyn UsageLedger>,
    pub assessor: Arc<DiscountAssessor>,
    pub max_auto_apply_candidates: u32,
}

impl DiscountAppState {
    pub fn new(
        discount_repository: Arc<dyn DiscountRepository>,
        usage_ledger: Arc<dyn UsageLedger>,
        customer_reader: Arc<dyn CustomerReader>,
        policy: DiscountPolicy,
        max_auto_apply_candidates: u32,
    ) -> Self {
        let assessor = Arc::new(DiscountAssessor::new(
            usage_ledger.clone(),
            customer_reader,
            policy,
        ));
        Self {
            discount_repository,
            usage_ledger,
            assessor,
            max_auto_apply_candidates,
        }
    }

    pub fn validate_handler(&self) -> ValidateDiscountHandler {
        ValidateDiscountHandler::new(self.discount_repository.clone(), self.assessor.clone())
    }

    pub fn auto_apply_handler(&self) -> GetAutoApplyDiscountsHandler {
        GetAutoApplyDiscountsHandler::new(
            self.discount_repository.clone(),
            self.assessor.clone(),
            self.max_auto_apply_candidates,
        )
    }

    pub fn resolve_handler(&self) -> ResolveDiscountsHandler {
        ResolveDiscountsHandler::new(
            self.discount_repository.clone(),
            self.assessor.clone(),
            self.max_auto_apply_candidates,
        )
    }

    pub fn record_usage_handler(&self) -> RecordDiscountUsageHandler {
        RecordDiscountUsageHandler::new(
            self.discount_repository.clone(),
            self.usage_ledger.clone(),
            self.assessor.clone(),
        )
    }

    pub fn create_handler(&self) -> CreateDiscountHandler {
        CreateDiscountHandler::new(self.discount_repository.clone())
    }

    pub fn update_handler(&self) -> UpdateDiscountHandler {
        UpdateDiscountHandler::new(self.discount_repository.clone())
    }

    pub fn toggle_handler(&self) -> ToggleDiscountHandler {
        ToggleDiscountHandler::new(self.discount_repository.clone())
    }

    pub fn stats_handler(&self) -> GetDiscountStatsHandler {
        GetDiscountStatsHandler::new(self.discount_repository.clone(), self.usage_ledger.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Shopper Context
// ════════════════════════════════════════════════════════════════════════════════

/// Shopper identity forwarded by the gateway in `X-User-Id`.
///
/// Absent header means guest checkout.
#[derive(Debug, Clone)]
pub struct Shopper(pub Option<UserId>);

#[async_trait]
impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = DiscountApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get("X-User-Id") else {
            return Ok(Shopper(None));
        };
        let user_id = value
            .to_str()
            .ok()
            .and_then(|s| UserId::new(s).ok())
            .ok_or_else(|| DiscountError::validation("X-User-Id", "Malformed user id header"))?;
        Ok(Shopper(Some(user_id)))
    }
}

fn parse_discount_id(raw: &str) -> Result<DiscountId, DiscountError> {
    raw.parse()
        .map_err(|_| DiscountError::validation("discount_id", format!("'{}' is not a valid id", raw)))
}

fn log_cart_total_mismatch(claimed: Option<rust_decimal::Decimal>, cart: &CartSnapshot) {
    if let Some(claimed) = claimed {
        if claimed != cart.subtotal().amount() {
            debug!(
                claimed = %claimed,
                computed = %cart.subtotal(),
                "Client cart_total ignored in favour of line items"
            );
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Storefront Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/discounts/validate - Live preview of an entered code
pub async fn validate_discount(
    State(state): State<DiscountAppState>,
    Shopper(user_id): Shopper,
    Json(request): Json<ValidateDiscountRequest>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let cart = cart_from_request(request.items, request.shipping_total)?;
    log_cart_total_mismatch(request.cart_total, &cart);

    let result = state
        .validate_handler()
        .handle(ValidateDiscountQuery {
            code: request.code,
            cart,
            user_id,
        })
        .await;

    Ok(Json(ValidateDiscountResponse::from(result)))
}

/// POST /api/discounts/auto-apply - Best auto-apply discount for a cart
pub async fn get_auto_apply_discount(
    State(state): State<DiscountAppState>,
    Shopper(user_id): Shopper,
    Json(request): Json<AutoApplyRequest>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let cart = cart_from_request(request.items, request.shipping_total)?;
    log_cart_total_mismatch(request.cart_total, &cart);

    let best = state
        .auto_apply_handler()
        .handle(GetAutoApplyDiscountsQuery { user_id, cart })
        .await?;

    Ok(Json(AutoApplyResponse::from(best)))
}

/// POST /api/discounts/resolve - Final applied discount set
pub async fn resolve_discounts(
    State(state): State<DiscountAppState>,
    Shopper(user_id): Shopper,
    Json(request): Json<ResolveDiscountsRequest>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let cart = cart_from_request(request.items, request.shipping_total)?;

    let result = state
        .resolve_handler()
        .handle(ResolveDiscountsQuery {
            code: request.code,
            user_id,
            cart,
        })
        .await?;

    Ok(Json(ResolveDiscountsResponse::from(result)))
}

/// POST /api/discounts/redemptions - Record usage at order confirmation
pub async fn record_usage(
    State(state): State<DiscountAppState>,
    Shopper(user_id): Shopper,
    Json(request): Json<RecordUsageRequest>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let cmd = RecordDiscountUsageCommand {
        discount_id: parse_discount_id(&request.discount_id)?,
        user_id,
        order_id: request.order_id()?,
        amount_saved: request.amount_saved()?,
        order_total: request.order_total()?,
        cart: cart_from_request(request.items, request.shipping_total)?,
    };

    let result = state.record_usage_handler().handle(cmd).await?;

    let status = if result.already_recorded {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(RedemptionResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/discounts - Create a discount
pub async fn create_discount(
    State(state): State<DiscountAppState>,
    Json(request): Json<DiscountRulesRequest>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let rules = request.into_rules(Timestamp::now())?;
    let discount = state
        .create_handler()
        .handle(CreateDiscountCommand { rules })
        .await?;

    Ok((StatusCode::CREATED, Json(DiscountResponse::from(discount))))
}

/// PUT /api/admin/discounts/:id - Replace a discount's rules
pub async fn update_discount(
    State(state): State<DiscountAppState>,
    Path(id): Path<String>,
    Json(request): Json<DiscountRulesRequest>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let cmd = UpdateDiscountCommand {
        discount_id: parse_discount_id(&id)?,
        rules: request.into_rules(Timestamp::now())?,
    };
    let discount = state.update_handler().handle(cmd).await?;

    Ok(Json(DiscountResponse::from(discount)))
}

/// POST /api/admin/discounts/:id/toggle - Flip the active flag
pub async fn toggle_discount(
    State(state): State<DiscountAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let discount = state
        .toggle_handler()
        .handle(ToggleDiscountCommand {
            discount_id: parse_discount_id(&id)?,
        })
        .await?;

    Ok(Json(DiscountResponse::from(discount)))
}

/// GET /api/admin/discounts/:id/stats - Usage statistics
pub async fn get_discount_stats(
    State(state): State<DiscountAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DiscountApiError> {
    let result = state
        .stats_handler()
        .handle(GetDiscountStatsQuery {
            discount_id: parse_discount_id(&id)?,
        })
        .await?;

    Ok(Json(DiscountStatsResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts discount errors to HTTP responses.
#[derive(Debug)]
pub struct DiscountApiError(DiscountError);

impl From<DiscountError> for DiscountApiError {
    fn from(err: DiscountError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for DiscountApiError {
    fn from(err: DomainError) -> Self {
        Self(DiscountError::from(err))
    }
}

impl IntoResponse for DiscountApiError {
    fn into_response(self) -> axum::response::Response {
        match &self.0 {
            DiscountError::Infrastructure(msg) => error!(error = %msg, "Discount request failed"),
            err if err.is_recoverable() => {
                debug!(code = %err.code(), "Discount dropped; caller proceeds without it")
            }
            _ => {}
        }

        let (status, error_code) = match &self.0 {
            DiscountError::NotFound(_) => (StatusCode::NOT_FOUND, "DISCOUNT_NOT_FOUND"),
            DiscountError::CodeExists(_) => (StatusCode::CONFLICT, "DISCOUNT_CODE_EXISTS"),
            DiscountError::InvalidCode(_) | DiscountError::ValidationFailed { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
            }
            DiscountError::Ineligible { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "DISCOUNT_INELIGIBLE")
            }
            DiscountError::LimitExceeded { .. } => (StatusCode::CONFLICT, "LIMIT_EXCEEDED"),
            DiscountError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = match &self.0 {
            DiscountError::Ineligible { reason, .. } => ErrorResponse::new(error_code, self.0.message())
                .with_details(serde_json::json!({ "reason": reason })),
            DiscountError::LimitExceeded { limit, .. } => {
                ErrorResponse::new(error_code, self.0.message()).with_details(limit_details(limit))
            }
            DiscountError::ValidationFailed { field, .. } => {
                ErrorResponse::new(error_code, self.0.message())
                    .with_details(serde_json::json!({ "field": field }))
            }
            // Infrastructure details stay in the logs
            DiscountError::Infrastructure(_) => {
                ErrorResponse::new(error_code, "An internal error occurred")
            }
            _ => ErrorResponse::new(error_code, self.0.message()),
        };

        (status, Json(body)).into_response()
    }
}

fn limit_details(limit: &LimitKind) -> serde_json::Value {
    serde_json::to_value(limit).unwrap_or(serde_json::Value::Null)
}
