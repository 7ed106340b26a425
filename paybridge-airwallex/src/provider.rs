use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use paybridge_core::{
    NotifyMode, NotifyResult, PayRequest, PayResponse, PaymentError, PaymentProvider, PaymentState,
};
use paybridge_shared::Masked;
use serde_json::Value;

use crate::client::{Credentials, GatewayClient};
use crate::error::{AirwallexError, Result};
use crate::intent::{build_checkout_url, IntentLifecycle};
use crate::models::{IntentResponse, PaymentIntent};
use crate::reconcile::reconcile_intent;
use crate::token::TokenCache;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.airwallex.com";
pub const DEFAULT_CHECKOUT_URL: &str = "https://checkout.airwallex.com/#/standalone/checkout?";

/// Settings for [`AirwallexProvider`].
#[derive(Debug, Clone)]
pub struct AirwallexOptions {
    pub credentials: Credentials,
    pub api_endpoint: String,
    pub checkout_url: String,
    pub timeout: Duration,
    pub token_expiry_skew: Duration,
    pub notify_mode: NotifyMode,
}

impl AirwallexOptions {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(client_id, api_key),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            checkout_url: DEFAULT_CHECKOUT_URL.to_string(),
            timeout: Duration::from_secs(10),
            token_expiry_skew: Duration::ZERO,
            notify_mode: NotifyMode::default(),
        }
    }

    #[must_use]
    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn checkout_url(mut self, url: impl Into<String>) -> Self {
        self.checkout_url = url.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn token_expiry_skew(mut self, skew: Duration) -> Self {
        self.token_expiry_skew = skew;
        self
    }

    #[must_use]
    pub fn notify_mode(mut self, mode: NotifyMode) -> Self {
        self.notify_mode = mode;
        self
    }
}

pub struct AirwallexProvider {
    lifecycle: IntentLifecycle,
    notify_mode: NotifyMode,
}

impl AirwallexProvider {
    pub fn new(options: AirwallexOptions) -> Result<Self> {
        let client = Arc::new(GatewayClient::new(
            options.credentials,
            &options.api_endpoint,
            options.timeout,
        )?);
        let skew = chrono::Duration::from_std(options.token_expiry_skew).unwrap_or_else(|_| chrono::Duration::zero());
        let tokens = Arc::new(TokenCache::with_skew(skew));

        Ok(Self::from_lifecycle(
            IntentLifecycle::new(client, tokens, &options.checkout_url),
            options.notify_mode,
        ))
    }

    /// Assemble from parts, e.g. to share one [`TokenCache`] between providers.
    pub fn from_lifecycle(lifecycle: IntentLifecycle, notify_mode: NotifyMode) -> Self {
        Self {
            lifecycle,
            notify_mode,
        }
    }

    pub fn notify_mode(&self) -> NotifyMode {
        self.notify_mode
    }

    async fn requery(&self, payload: &WebhookPayload, order_id: &str, body: &str) -> Result<NotifyResult> {
        let intent_id = payload.intent_id(order_id).ok_or_else(|| {
            AirwallexError::InvalidNotification("notification names no payment intent".to_string())
        })?;

        let intent = self.lifecycle.query_intent(intent_id).await?;
        Ok(with_message(reconcile_intent(&intent, order_id), body))
    }

    async fn trust_payload(&self, payload: &WebhookPayload, order_id: &str, body: &str) -> Result<NotifyResult> {
        let snapshot = payload.snapshot(order_id)?;
        let trusted = with_message(reconcile_intent(&snapshot, order_id), body);
        if trusted.payment_status != PaymentState::Paid {
            return Ok(trusted);
        }

        // Paid is only honored once the gateway confirms it.
        let confirmed = self.requery(payload, order_id, body).await?;
        if confirmed.payment_status != PaymentState::Paid {
            tracing::warn!(
                order_id,
                confirmed = ?confirmed.payment_status,
                "Notification claimed payment but gateway disagrees"
            );
        }
        Ok(confirmed)
    }
}

fn with_message(mut result: NotifyResult, body: &str) -> NotifyResult {
    // Keep the reconciler's diagnostic for errors; otherwise record what the gateway sent.
    if result.payment_status != PaymentState::Error {
        result.notify_message = body.to_string();
    }
    result
}

#[async_trait]
impl PaymentProvider for AirwallexProvider {
    async fn pay(&self, request: &PayRequest) -> std::result::Result<PayResponse, PaymentError> {
        request.validate()?;

        let intent = self.lifecycle.create_intent(request).await.map_err(|err| {
            tracing::error!(order_id = %request.order_id, error = %err, "Payment could not be started");
            err
        })?;

        Ok(PayResponse {
            pay_url: build_checkout_url(self.lifecycle.checkout_url(), &intent, request),
            order_id: intent.id,
        })
    }

    async fn notify(&self, body: &[u8], order_id: &str) -> std::result::Result<NotifyResult, PaymentError> {
        let text = String::from_utf8_lossy(body);
        let payload = WebhookPayload::parse(body)?;

        let outcome = match self.notify_mode {
            NotifyMode::Requery => self.requery(&payload, order_id, &text).await,
            NotifyMode::TrustPayload => self.trust_payload(&payload, order_id, &text).await,
        };

        match outcome {
            Ok(result) => {
                tracing::info!(
                    order_id,
                    event = payload.event.as_deref().unwrap_or("-"),
                    status = ?result.payment_status,
                    "Processed gateway notification"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::error!(order_id, error = %err, "Gateway notification failed");
                Err(err.into())
            }
        }
    }

    async fn query(&self, order_id: &str) -> std::result::Result<NotifyResult, PaymentError> {
        let intent = self.lifecycle.query_intent(order_id).await.map_err(|err| {
            tracing::error!(order_id, error = %err, "Payment status query failed");
            err
        })?;
        Ok(reconcile_intent(&intent, order_id))
    }
}

/// Inbound notification body.
///
/// Accepts both a bare intent object and the event envelope
/// `{ "name": ..., "data": { "object": { ... } } }`.
#[derive(Debug)]
struct WebhookPayload {
    event: Option<String>,
    object: Value,
}

impl WebhookPayload {
    fn parse(body: &[u8]) -> Result<Self> {
        let mut root: Value = serde_json::from_slice(body)
            .map_err(|e| AirwallexError::InvalidNotification(format!("body is not JSON: {}", e)))?;
        if !root.is_object() {
            return Err(AirwallexError::InvalidNotification("body is not a JSON object".to_string()));
        }

        let event = root.get("name").and_then(Value::as_str).map(str::to_string);
        let enveloped = root.pointer("/data/object").is_some_and(Value::is_object);
        let object = if enveloped {
            root.pointer_mut("/data/object").map(Value::take).unwrap_or_default()
        } else {
            root
        };
        Ok(Self { event, object })
    }

    /// The order id the platform routed this notification to wins over the body's claim.
    fn intent_id<'a>(&'a self, order_id: &'a str) -> Option<&'a str> {
        if !order_id.is_empty() {
            return Some(order_id);
        }
        self.object
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    fn snapshot(&self, order_id: &str) -> Result<PaymentIntent> {
        if self.object.get("status").and_then(Value::as_str).is_none() {
            return Err(AirwallexError::InvalidNotification("invalid status in notification".to_string()));
        }
        let mut resp: IntentResponse = serde_json::from_value(self.object.clone())
            .map_err(|e| AirwallexError::InvalidNotification(e.to_string()))?;
        if resp.id.is_empty() {
            resp.id = order_id.to_string();
        }
        Ok(PaymentIntent::from(resp))
    }
}

impl std::fmt::Debug for AirwallexProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirwallexProvider")
            .field("checkout_url", &self.lifecycle.checkout_url())
            .field("notify_mode", &self.notify_mode)
            .field("credentials", &Masked(()))
            .finish()
    }
}
