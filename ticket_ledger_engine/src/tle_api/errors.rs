use thiserror::Error;
use tlg_common::Currency;

use crate::{
    db::traits::{ProcessorError, RecordStoreError, Table},
    db_types::{CapacityPool, PaymentStatus},
};

/// Problems with what the purchaser asked for. These are reported back to them as-is and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("You can buy at most {limit} of {category} tickets, but asked for {requested}")]
    TicketLimitExceeded { category: String, limit: i64, requested: i64 },
    #[error("'{0}' is not something we sell")]
    UnknownCategory(String),
    #[error("The cart is malformed: {0}")]
    MalformedCart(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("A ticket has already been purchased for this account")]
    AlreadyPurchased,
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("No {table} record found for '{key}'")]
    NotFound { table: Table, key: String },
    #[error("{count} {table} records match '{key}'. Expected exactly one")]
    AmbiguousMatch { table: Table, key: String, count: usize },
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Not enough {pool} tickets left. {remaining} remaining")]
    Capacity { pool: CapacityPool, remaining: i64 },
    #[error("Record store error: {0}")]
    RecordStore(RecordStoreError),
    #[error("Payment processor error: {0}")]
    Processor(ProcessorError),
    #[error("Webhook signature verification failed: {0}")]
    Signature(String),
    #[error("Order {0} has already been saved")]
    AlreadyExists(String),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition { order_id: String, from: PaymentStatus, to: PaymentStatus },
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(Currency),
}

impl LedgerError {
    /// True for failures of the record store or payment processor themselves, as opposed to something wrong with the
    /// request or the data.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LedgerError::RecordStore(RecordStoreError::Transport(_) | RecordStoreError::Rejected(_)) |
                LedgerError::Processor(ProcessorError::Transport(_) | ProcessorError::Rejected(_))
        )
    }
}

impl From<RecordStoreError> for LedgerError {
    fn from(e: RecordStoreError) -> Self {
        match e {
            RecordStoreError::Malformed(s) => LedgerError::MalformedRecord(s),
            e => LedgerError::RecordStore(e),
        }
    }
}

impl From<ProcessorError> for LedgerError {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::InvalidSignature(s) => LedgerError::Signature(s),
            e => LedgerError::Processor(e),
        }
    }
}
