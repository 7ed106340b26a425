use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use paybridge_core::{NotifyResult, PayRequest, PayResponse};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments", post(create_payment))
        .route("/v1/payments/{intent_id}", get(query_payment))
}

/// POST /v1/payments
/// Start a payment and hand back the hosted checkout URL
pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<PayRequest>, JsonRejection>,
) -> Result<Json<PayResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;
    tracing::info!(order_id = %req.order_id, currency = %req.currency, "Creating payment");

    let response = state.provider.pay(&req).await?;
    Ok(Json(response))
}

/// GET /v1/payments/{intent_id}
pub async fn query_payment(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
) -> Result<Json<NotifyResult>, AppError> {
    let result = state.provider.query(&intent_id).await?;
    Ok(Json(result))
}
