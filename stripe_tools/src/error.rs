use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach Stripe: {0}")]
    RestRequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Request failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
}

impl StripeApiError {
    /// Network failures, timeouts, rate limiting and server errors.
    pub fn is_transport(&self) -> bool {
        match self {
            StripeApiError::RestRequestError(_) => true,
            StripeApiError::QueryError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
