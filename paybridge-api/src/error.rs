use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use paybridge_core::PaymentError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    BadNotification(String),
    UpstreamError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadNotification(msg) => {
                tracing::warn!("Rejected notification: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::UpstreamError(msg) => {
                // The cause is logged; the caller only learns the payment failed.
                tracing::error!("Payment provider error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment provider unavailable".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidRequest(msg) => AppError::ValidationError(msg),
            PaymentError::InvalidNotification(msg) => AppError::BadNotification(msg),
            PaymentError::Provider(source) => AppError::UpstreamError(error_chain(source.as_ref())),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Anyhow(err)
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
