use paybridge_core::NotifyMode;
use paybridge_shared::Masked;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub airwallex: AirwallexSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AirwallexSettings {
    pub client_id: Masked<String>,
    pub api_key: Masked<String>,
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default = "default_checkout_url")]
    pub checkout_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub token_expiry_skew_seconds: u64,
    #[serde(default)]
    pub notify_mode: NotifyMode,
}

fn default_api_endpoint() -> String {
    "https://api.airwallex.com".to_string()
}

fn default_checkout_url() -> String {
    "https://checkout.airwallex.com/#/standalone/checkout?".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        tracing::debug!(%run_mode, "Loading configuration");

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `PAYBRIDGE__AIRWALLEX__API_KEY=...`
            .add_source(config::Environment::with_prefix("PAYBRIDGE").separator("__"));

        Self::from_builder(builder)
    }

    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let gateway = &self.airwallex;
        if gateway.client_id.is_empty() || gateway.api_key.is_empty() {
            return Err(config::ConfigError::Message(
                "airwallex.client_id and airwallex.api_key must be set".to_string(),
            ));
        }
        if gateway.timeout_seconds == 0 {
            return Err(config::ConfigError::Message(
                "airwallex.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
