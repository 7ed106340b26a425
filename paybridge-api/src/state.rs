use std::sync::Arc;
use paybridge_core::PaymentProvider;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn PaymentProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }
}
