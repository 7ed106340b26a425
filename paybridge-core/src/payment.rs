use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Platform-wide payment state. Every gateway vocabulary collapses onto these five.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentState {
    Created,
    Paid,
    Canceled,
    Timeout,
    Error,
}

/// How an inbound gateway notification is interpreted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// The notification is only a trigger; the payment is re-queried from the gateway.
    #[default]
    Requery,
    /// Reconcile from the notification body. A paid outcome is still confirmed by a query.
    TrustPayload,
}

/// Generic request to start a payment, independent of the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PayRequest {
    /// Caller-supplied order identifier; doubles as the idempotency key.
    pub order_id: String,
    pub product_name: String,
    pub product_display_name: String,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub product_image: String,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub return_url: String,
    pub provider_name: String,
}

impl PayRequest {
    pub fn validate(&self) -> CoreResult<()> {
        if self.order_id.trim().is_empty() {
            return Err(CoreError::ValidationError("order_id must not be empty".to_string()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(CoreError::ValidationError(format!("price must be positive, got {}", self.price)));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::ValidationError(format!("invalid currency code: {:?}", self.currency)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayResponse {
    pub pay_url: String,
    /// Gateway-side identifier later notifications and queries are keyed by.
    pub order_id: String,
}

/// Normalized outcome of a notification or status query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyResult {
    pub order_id: String,
    pub payment_name: String,
    pub payment_status: PaymentState,
    pub price: f64,
    pub currency: String,
    pub product_name: String,
    pub product_display_name: String,
    pub provider_name: String,
    pub notify_message: String,
}

impl NotifyResult {
    pub fn new(payment_name: &str, order_id: &str, payment_status: PaymentState) -> Self {
        Self {
            order_id: order_id.to_string(),
            payment_name: payment_name.to_string(),
            payment_status,
            price: 0.0,
            currency: String::new(),
            product_name: String::new(),
            product_display_name: String::new(),
            provider_name: String::new(),
            notify_message: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),
    /// The inbound notification could not be understood.
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),
    /// The gateway or the path to it failed.
    #[error("Payment provider failure: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for PaymentError {
    fn from(err: CoreError) -> Self {
        PaymentError::InvalidRequest(err.to_string())
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Start a payment and return the hosted checkout URL the end user is redirected to.
    async fn pay(&self, request: &PayRequest) -> Result<PayResponse, PaymentError>;

    /// Interpret an asynchronous notification posted by the gateway.
    async fn notify(&self, body: &[u8], order_id: &str) -> Result<NotifyResult, PaymentError>;

    /// Fetch the current state of a payment from the gateway.
    async fn query(&self, order_id: &str) -> Result<NotifyResult, PaymentError>;

    /// Short code the gateway expects as the acknowledgement body.
    fn get_response_error(&self, err: Option<&PaymentError>) -> &'static str {
        match err {
            None => "success",
            Some(_) => "fail",
        }
    }
}
