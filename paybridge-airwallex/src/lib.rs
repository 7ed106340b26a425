//! Airwallex hosted-checkout integration.
//!
//! [`AirwallexProvider`] is the entry point; the other modules are its
//! building blocks and are public so callers can inject their own
//! [`TokenCache`] or drive the lifecycle directly.

pub mod client;
pub mod error;
pub mod intent;
pub mod models;
pub mod provider;
pub mod reconcile;
pub mod token;

pub use client::{Credentials, GatewayClient};
pub use error::{AirwallexError, Result};
pub use intent::{build_checkout_url, logo_url, IntentLifecycle};
pub use models::{CreatedIntent, PaymentIntent};
pub use provider::{AirwallexOptions, AirwallexProvider};
pub use reconcile::{reconcile, reconcile_intent};
pub use token::{parse_expiry, CachedToken, TokenCache, TokenSource};

/// Name reported in every [`paybridge_core::NotifyResult`] this crate produces.
pub const PAYMENT_NAME: &str = "Airwallex";
