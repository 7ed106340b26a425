use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use paybridge_core::NotifyResult;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/airwallex/{order_id}", post(handle_airwallex_webhook))
}

/// POST /v1/webhooks/airwallex/{order_id}
/// Receive payment status updates from Airwallex
///
/// The body is passed through untouched; the provider decides how far to trust it.
pub async fn handle_airwallex_webhook(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    body: Bytes,
) -> Result<Json<NotifyResult>, AppError> {
    tracing::info!(%order_id, bytes = body.len(), "Received webhook");

    match state.provider.notify(&body, &order_id).await {
        Ok(result) => {
            tracing::info!(
                %order_id,
                status = ?result.payment_status,
                reply = state.provider.get_response_error(None),
                "Webhook processed"
            );
            Ok(Json(result))
        }
        Err(err) => {
            tracing::warn!(%order_id, reply = state.provider.get_response_error(Some(&err)), "Webhook rejected");
            Err(err.into())
        }
    }
}
