use thiserror::Error;

use crate::db::traits::{Fields, StoreRecord, Table};

#[derive(Debug, Clone, Error)]
pub enum RecordStoreError {
    #[error("Could not reach the record store: {0}")]
    Transport(String),
    #[error("The record store rejected the request: {0}")]
    Rejected(String),
    #[error("Record {0} does not exist")]
    RecordNotFound(String),
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// The minimal record store interface the ledger relies on.
///
/// Field values are JSON values. Queries match on the *string form* of a field, so `query(Orders, "Total Tickets",
/// "2")` finds orders where the cell holds the number 2 as well as the string "2".
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// All records in `table` whose `field` equals `value`.
    async fn query(&self, table: Table, field: &str, value: &str) -> Result<Vec<StoreRecord>, RecordStoreError>;

    async fn list(&self, table: Table) -> Result<Vec<StoreRecord>, RecordStoreError>;

    /// Creates a record and returns its new id.
    async fn create(&self, table: Table, fields: Fields) -> Result<String, RecordStoreError>;

    /// Overwrites the given fields of record `id`. Fields that are not mentioned keep their values.
    async fn update_partial(&self, table: Table, id: &str, fields: Fields) -> Result<(), RecordStoreError>;
}
