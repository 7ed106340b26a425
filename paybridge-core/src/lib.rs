pub mod descriptor;
pub mod payment;

pub use descriptor::ProductDescriptor;
pub use payment::{
    NotifyMode, NotifyResult, PayRequest, PayResponse, PaymentError, PaymentProvider, PaymentState,
};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Malformed descriptor: expected {expected} fields, found {found}")]
    MalformedDescriptor { expected: usize, found: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
