//! Collapses the gateway's two-level intent/attempt status onto [`PaymentState`].
//!
//! The intent status is checked first. `SUCCEEDED` on the intent precedes
//! settlement, so only then is the attempt status consulted, and only
//! `PAID`/`SETTLED` count as paid. Anything outside the tables is an error,
//! never a success.

use paybridge_core::{descriptor, NotifyResult, PaymentState};

use crate::error::{AirwallexError, Result};
use crate::models::PaymentIntent;
use crate::PAYMENT_NAME;

pub fn reconcile(intent_status: &str, attempt_status: &str) -> Result<PaymentState> {
    match intent_status {
        "PENDING" | "REQUIRES_PAYMENT_METHOD" | "REQUIRES_CUSTOMER_ACTION" | "REQUIRES_CAPTURE" => {
            Ok(PaymentState::Created)
        }
        "CANCELLED" => Ok(PaymentState::Canceled),
        "EXPIRED" => Ok(PaymentState::Timeout),
        "SUCCEEDED" => match attempt_status {
            "PAID" | "SETTLED" => Ok(PaymentState::Paid),
            // Still in flight despite the outer label.
            "CANCELLED" | "EXPIRED" | "RECEIVED" | "AUTHENTICATION_REDIRECTED" | "AUTHORIZED"
            | "CAPTURE_REQUESTED" => Ok(PaymentState::Created),
            _ => Err(unexpected(intent_status, attempt_status)),
        },
        _ => Err(unexpected(intent_status, attempt_status)),
    }
}

fn unexpected(intent_status: &str, attempt_status: &str) -> AirwallexError {
    AirwallexError::UnexpectedStatus {
        intent_status: intent_status.to_string(),
        attempt_status: attempt_status.to_string(),
    }
}

/// Build the normalized result for an intent snapshot.
///
/// An unexpected status combination becomes `PaymentState::Error` with the
/// diagnostic as the message.
pub fn reconcile_intent(intent: &PaymentIntent, order_id: &str) -> NotifyResult {
    let state = match reconcile(&intent.status, &intent.payment_attempt_status) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(intent_id = %intent.id, error = %err, "Unreconcilable intent status");
            let mut result = NotifyResult::new(PAYMENT_NAME, order_id, PaymentState::Error);
            result.notify_message = err.to_string();
            return result;
        }
    };

    let mut result = NotifyResult::new(PAYMENT_NAME, order_id, state);
    result.price = intent.amount;
    result.currency = intent.currency.clone();
    result.notify_message = format!(
        "intent {} status={} attempt={}",
        intent.id, intent.status, intent.payment_attempt_status
    );

    let mut candidates = intent.descriptors().peekable();
    let has_descriptor = candidates.peek().is_some();
    let unpacked = candidates.find_map(|packed| match descriptor::unpack(packed) {
        Ok(names) => Some(names),
        Err(err) => {
            tracing::debug!(intent_id = %intent.id, error = %err, "Skipping unreadable descriptor");
            None
        }
    });

    match unpacked {
        Some(names) => {
            result.product_name = names.product_name;
            result.product_display_name = names.product_display_name;
            result.provider_name = names.provider_name;
        }
        None if has_descriptor => {
            tracing::warn!(intent_id = %intent.id, "No intent descriptor could be unpacked");
        }
        None if state == PaymentState::Paid => {
            tracing::warn!(intent_id = %intent.id, "Paid intent carries no descriptor");
        }
        None => {}
    }

    result
}
