use paybridge_core::PaymentError;

pub type Result<T> = std::result::Result<T, AirwallexError>;

#[derive(Debug, thiserror::Error)]
pub enum AirwallexError {
    #[error("Authentication with the gateway failed: {reason}")]
    Auth {
        reason: String,
        #[source]
        source: Option<Box<AirwallexError>>,
    },

    #[error("Unrecognized token expiry {raw:?}: {source}")]
    ExpiryFormat {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway returned status {status}: {body}")]
    Gateway {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Failed to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to create payment intent: {0}")]
    IntentCreation(#[source] Box<AirwallexError>),

    #[error("Unexpected status combination: intent={intent_status:?}, attempt={attempt_status:?}")]
    UnexpectedStatus {
        intent_status: String,
        attempt_status: String,
    },

    #[error("Invalid notification: {0}")]
    InvalidNotification(String),
}

impl AirwallexError {
    pub(crate) fn auth(reason: impl Into<String>) -> Self {
        AirwallexError::Auth {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn auth_caused_by(reason: impl Into<String>, cause: AirwallexError) -> Self {
        AirwallexError::Auth {
            reason: reason.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Whether the gateway rejected the bearer token itself.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            AirwallexError::Gateway { status, .. } => *status == 401,
            AirwallexError::IntentCreation(inner) => inner.is_unauthorized(),
            _ => false,
        }
    }
}

impl From<AirwallexError> for PaymentError {
    fn from(err: AirwallexError) -> Self {
        match err {
            AirwallexError::InvalidNotification(msg) => PaymentError::InvalidNotification(msg),
            other => PaymentError::Provider(Box::new(other)),
        }
    }
}
