//! Wire schemas for the gateway's REST API, plus the snapshots built from them.
//!
//! Responses are decoded once at the boundary; a missing or mistyped required
//! field surfaces as a single decode error.

use paybridge_core::PayRequest;
use paybridge_shared::Masked;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key the packed descriptor is mirrored under.
pub const METADATA_DESCRIPTOR: &str = "descriptor";

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIntentRequest<'a> {
    pub request_id: &'a str,
    pub amount: f64,
    pub currency: &'a str,
    pub merchant_order_id: &'a str,
    pub descriptor: &'a str,
    pub metadata: IntentMetadata<'a>,
    pub order: IntentOrder<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IntentMetadata<'a> {
    pub descriptor: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct IntentOrder<'a> {
    pub products: Vec<IntentProduct<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IntentProduct<'a> {
    pub name: &'a str,
    pub quantity: u32,
    pub desc: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    pub image_url: &'a str,
}

fn is_blank(value: &&str) -> bool {
    value.is_empty()
}

impl<'a> CreateIntentRequest<'a> {
    pub fn from_pay_request(request: &'a PayRequest, descriptor: &'a str) -> Self {
        Self {
            request_id: &request.order_id,
            amount: request.price,
            currency: &request.currency,
            merchant_order_id: &request.order_id,
            descriptor,
            metadata: IntentMetadata {
                descriptor,
                description: &request.product_description,
            },
            order: IntentOrder {
                products: vec![IntentProduct {
                    name: &request.product_display_name,
                    quantity: 1,
                    desc: &request.product_description,
                    image_url: &request.product_image,
                }],
            },
        }
    }
}

/// Result of `payment_intents/create`: everything the hosted checkout page needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedIntent {
    pub id: String,
    pub client_secret: Masked<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PaymentAttempt {
    #[serde(default)]
    pub status: String,
}

/// Intent as returned by `payment_intents/{id}` and as echoed by webhooks.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct IntentResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub merchant_order_id: String,
    #[serde(default)]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub latest_payment_attempt: Option<PaymentAttempt>,
}

/// Point-in-time snapshot of a gateway intent. Never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Masked<String>,
    pub status: String,
    /// Empty until the intent has a payment attempt.
    pub payment_attempt_status: String,
    pub amount: f64,
    pub currency: String,
    pub request_id: String,
    pub merchant_order_id: String,
    pub descriptor: Option<String>,
    pub metadata: Map<String, Value>,
}

impl PaymentIntent {
    /// Packed product descriptors, top-level field first, then the metadata mirror.
    ///
    /// The gateway may rewrite the top-level statement descriptor, so callers
    /// should take the first candidate that actually unpacks.
    pub fn descriptors(&self) -> impl Iterator<Item = &str> {
        let metadata = self.metadata.get(METADATA_DESCRIPTOR).and_then(Value::as_str);
        self.descriptor
            .as_deref()
            .into_iter()
            .chain(metadata)
            .filter(|d| !d.is_empty())
    }
}

impl From<IntentResponse> for PaymentIntent {
    fn from(resp: IntentResponse) -> Self {
        Self {
            id: resp.id,
            client_secret: Masked(resp.client_secret.unwrap_or_default()),
            status: resp.status,
            payment_attempt_status: resp
                .latest_payment_attempt
                .map(|attempt| attempt.status)
                .unwrap_or_default(),
            amount: resp.amount,
            currency: resp.currency,
            request_id: resp.request_id,
            merchant_order_id: resp.merchant_order_id,
            descriptor: resp.descriptor,
            metadata: resp.metadata.unwrap_or_default(),
        }
    }
}
