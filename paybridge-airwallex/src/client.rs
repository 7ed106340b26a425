use std::time::Duration;

use async_trait::async_trait;
use paybridge_shared::Masked;
use reqwest::{header, Method};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AirwallexError, Result};
use crate::models::LoginResponse;
use crate::token::{CachedToken, TokenSource};

const API_PREFIX: &str = "api/v1";
const LOGIN_PATH: &str = "authentication/login";
const HEADER_CLIENT_ID: &str = "x-client-id";
const HEADER_API_KEY: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: Masked<String>,
    pub api_key: Masked<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: Masked(client_id.into()),
            api_key: Masked(api_key.into()),
        }
    }
}

/// Authenticated JSON calls against the gateway's REST API.
///
/// No call is retried; every failure is returned to the caller as-is.
pub struct GatewayClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl GatewayClient {
    pub fn new(credentials: Credentials, endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.endpoint, API_PREFIX, path.trim_start_matches('/'))
    }

    /// Exchange the static client id and API key for a bearer token.
    ///
    /// Every failure here, transport included, is reported as an auth error.
    pub async fn login(&self) -> Result<CachedToken> {
        tracing::debug!(client_id = %self.credentials.client_id.hint(), "Logging in to gateway");

        let resp = self
            .http
            .post(self.url(LOGIN_PATH))
            .header(HEADER_CLIENT_ID, self.credentials.client_id.expose())
            .header(HEADER_API_KEY, self.credentials.api_key.expose())
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AirwallexError::auth_caused_by("login request failed", e.into()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| AirwallexError::auth_caused_by("failed to read login response", e.into()))?;

        if !status.is_success() {
            return Err(AirwallexError::auth(format!(
                "login rejected with status {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let login: LoginResponse = serde_json::from_slice(&body)
            .map_err(|e| AirwallexError::auth_caused_by("undecodable login response", e.into()))?;

        match (login.token, login.expires_at) {
            (Some(token), Some(expires_at)) if !token.is_empty() && !expires_at.is_empty() => {
                CachedToken::from_login(token, expires_at)
            }
            _ => Err(AirwallexError::auth("invalid response: missing token or expires_at")),
        }
    }

    /// Issue an authenticated request and decode the response into `T`.
    ///
    /// The body is decoded as JSON whatever the status, since the gateway
    /// reports failures as structured JSON.
    pub async fn request<T, B>(&self, method: Method, path: &str, token: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self
            .http
            .request(method.clone(), self.url(path))
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;

        if status.as_u16() >= 400 {
            tracing::warn!(%method, path, status = status.as_u16(), "Gateway request failed");
            return Err(AirwallexError::Gateway {
                status: status.as_u16(),
                body: value,
            });
        }

        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl TokenSource for GatewayClient {
    async fn login(&self) -> Result<CachedToken> {
        GatewayClient::login(self).await
    }
}
