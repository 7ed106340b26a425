use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use paybridge_airwallex::{AirwallexOptions, AirwallexProvider};
use paybridge_api::{app, AppState};
use paybridge_infra::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paybridge_api=debug,paybridge_airwallex=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting PayBridge API on port {}", config.server.port);

    let settings = &config.airwallex;
    let options = AirwallexOptions::new(settings.client_id.expose().as_str(), settings.api_key.expose().as_str())
        .api_endpoint(settings.api_endpoint.as_str())
        .checkout_url(settings.checkout_url.as_str())
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .token_expiry_skew(Duration::from_secs(settings.token_expiry_skew_seconds))
        .notify_mode(settings.notify_mode);
    let provider = AirwallexProvider::new(options).context("Failed to build Airwallex provider")?;
    tracing::info!(endpoint = %settings.api_endpoint, notify_mode = ?provider.notify_mode(), "Airwallex provider ready");

    let app = app(AppState::new(Arc::new(provider)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
