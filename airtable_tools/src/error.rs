use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirtableApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach Airtable: {0}")]
    RestRequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Airtable returned no record")]
    EmptyResponse,
}

impl AirtableApiError {
    /// Network failures, timeouts, rate limiting and server errors. These may succeed if retried later.
    pub fn is_transport(&self) -> bool {
        match self {
            AirtableApiError::RestRequestError(_) => true,
            AirtableApiError::QueryError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
