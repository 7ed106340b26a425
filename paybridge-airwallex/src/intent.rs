use std::sync::Arc;

use paybridge_core::{PayRequest, ProductDescriptor};
use reqwest::Method;
use url::{form_urlencoded, Url};

use crate::client::GatewayClient;
use crate::error::{AirwallexError, Result};
use crate::models::{CreateIntentRequest, CreatedIntent, IntentResponse, PaymentIntent};
use crate::token::TokenCache;

const CREATE_INTENT_PATH: &str = "pa/payment_intents/create";
const INTENT_PATH: &str = "pa/payment_intents";

/// 1x1 transparent GIF, shown when the merchant's own icon cannot be derived.
pub const PLACEHOLDER_LOGO: &str = "data:image/gif;base64,R0lGODlhAQABAAD/ACwAAAAAAQABAAACADs=";

/// Creates intents, derives checkout URLs and fetches intent snapshots.
pub struct IntentLifecycle {
    client: Arc<GatewayClient>,
    tokens: Arc<TokenCache>,
    checkout_url: String,
}

impl IntentLifecycle {
    pub fn new(client: Arc<GatewayClient>, tokens: Arc<TokenCache>, checkout_url: &str) -> Self {
        Self {
            client,
            tokens,
            checkout_url: checkout_url.to_string(),
        }
    }

    pub fn checkout_url(&self) -> &str {
        &self.checkout_url
    }

    async fn token(&self) -> Result<String> {
        self.tokens.get_token(self.client.as_ref()).await
    }

    /// A bearer token the gateway rejected is dropped so the next call logs in again.
    async fn drop_if_rejected<T>(&self, token: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                self.tokens.invalidate_if(token).await;
            }
        }
        result
    }

    async fn post_intent(&self, body: &CreateIntentRequest<'_>) -> Result<CreatedIntent> {
        let token = self.token().await?;
        let result = self
            .client
            .request(Method::POST, CREATE_INTENT_PATH, &token, Some(body))
            .await;
        self.drop_if_rejected(&token, result).await
    }

    async fn get_intent(&self, intent_id: &str) -> Result<IntentResponse> {
        let token = self.token().await?;
        let path = format!("{}/{}", INTENT_PATH, intent_id);
        let result = self.client.request::<_, ()>(Method::GET, &path, &token, None).await;
        self.drop_if_rejected(&token, result).await
    }

    pub async fn create_intent(&self, request: &PayRequest) -> Result<CreatedIntent> {
        let descriptor = ProductDescriptor::new(
            &request.product_name,
            &request.product_display_name,
            &request.provider_name,
        )
        .pack();
        let body = CreateIntentRequest::from_pay_request(request, &descriptor);

        match self.post_intent(&body).await {
            Ok(intent) => {
                tracing::info!(order_id = %request.order_id, intent_id = %intent.id, "Created payment intent");
                Ok(intent)
            }
            Err(err) => Err(AirwallexError::IntentCreation(Box::new(err))),
        }
    }

    pub async fn query_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        let intent = PaymentIntent::from(self.get_intent(intent_id).await?);
        tracing::debug!(
            intent_id,
            status = %intent.status,
            attempt_status = %intent.payment_attempt_status,
            "Fetched payment intent"
        );
        Ok(intent)
    }
}

/// Hosted checkout redirect for a freshly created intent.
///
/// The return URL serves as both success and fail callback; the platform
/// learns the outcome from a later status query.
pub fn build_checkout_url(checkout_base: &str, intent: &CreatedIntent, request: &PayRequest) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("intent_id", &intent.id)
        .append_pair("client_secret", intent.client_secret.expose())
        .append_pair("currency", &request.currency)
        .append_pair("amount", &request.price.to_string())
        .append_pair("sessionId", &request.order_id)
        .append_pair("successUrl", &request.return_url)
        .append_pair("failUrl", &request.return_url)
        .append_pair("logoUrl", &logo_url(&request.return_url))
        .finish();

    let separator = if checkout_base.ends_with('?') || checkout_base.ends_with('&') {
        ""
    } else if checkout_base.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{}{}{}", checkout_base, separator, query)
}

/// The merchant's favicon, so checkout shows the merchant's icon instead of the gateway's.
///
/// Never fails: an empty, unparseable or host-less return URL yields the placeholder.
pub fn logo_url(return_url: &str) -> String {
    if return_url.is_empty() {
        return PLACEHOLDER_LOGO.to_string();
    }

    let parsed = match Url::parse(return_url) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(return_url, error = %err, "Return URL unparseable, using placeholder logo");
            return PLACEHOLDER_LOGO.to_string();
        }
    };

    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}://{}:{}/favicon.ico", parsed.scheme(), host, port),
        (Some(host), None) => format!("{}://{}/favicon.ico", parsed.scheme(), host),
        (None, _) => PLACEHOLDER_LOGO.to_string(),
    }
}
