use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::*;
use ticket_ledger_engine::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("A remote service failed. {0}")]
    UpstreamError(String),
    #[error("Invalid webhook signature. {0}")]
    InvalidSignature(String),
    #[error("Could not process the payment event. {0}")]
    ReconciliationFailed(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ReconciliationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        if e.is_transport() {
            warn!("💻️ Remote call failed. {e}");
            return Self::UpstreamError(e.to_string());
        }
        match e {
            LedgerError::NotFound { .. } => Self::NoRecordFound(e.to_string()),
            LedgerError::Validation(_) | LedgerError::InvalidAmount(_) => Self::ValidationError(e.to_string()),
            LedgerError::Capacity { .. } | LedgerError::AlreadyExists(_) | LedgerError::InvalidTransition { .. } => {
                Self::Conflict(e.to_string())
            },
            LedgerError::AmbiguousMatch { .. } => {
                error!("💻️ {e}");
                Self::Conflict(e.to_string())
            },
            LedgerError::Signature(s) => Self::InvalidSignature(s),
            e => Self::BackendError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use ticket_ledger_engine::{
        db_types::CapacityPool,
        traits::{ProcessorError, RecordStoreError, Table},
        ValidationError,
    };

    use super::*;

    fn status(e: LedgerError) -> StatusCode {
        ServerError::from(e).status_code()
    }

    #[test]
    fn ledger_errors_map_to_status_codes() {
        assert_eq!(status(LedgerError::Validation(ValidationError::EmptyCart)), StatusCode::BAD_REQUEST);
        assert_eq!(status(LedgerError::Capacity { pool: CapacityPool::Cabin, remaining: 0 }), StatusCode::CONFLICT);
        assert_eq!(status(LedgerError::NotFound { table: Table::Purchasers, key: "x".into() }), StatusCode::NOT_FOUND);
        assert_eq!(
            status(LedgerError::AmbiguousMatch { table: Table::Purchasers, key: "x".into(), count: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status(ProcessorError::Transport("timeout".into()).into()), StatusCode::BAD_GATEWAY);
        assert_eq!(status(RecordStoreError::Rejected("422".into()).into()), StatusCode::BAD_GATEWAY);
        assert_eq!(status(ProcessorError::InvalidSignature("no v1".into()).into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(RecordStoreError::Malformed("Quantity".into()).into()), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn error_bodies_are_json() {
        let err = ServerError::Conflict("Not enough Cabin tickets left. 0 remaining".into());
        let body = err.error_response().into_body();
        let bytes = actix_web::body::to_bytes(body).await.unwrap();
        assert_eq!(
            String::from_utf8_lossy(&bytes),
            r#"{"error":"Not enough Cabin tickets left. 0 remaining"}"#
        );
    }
}
