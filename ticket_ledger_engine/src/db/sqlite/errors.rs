use thiserror::Error;

use crate::db::traits::RecordStoreError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Stored fields for record {0} are not a JSON object")]
    CorruptRecord(String),
    #[error("Record {0} does not exist")]
    RecordNotFound(String),
}

impl From<SqliteDatabaseError> for RecordStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::RecordNotFound(id) => RecordStoreError::RecordNotFound(id),
            SqliteDatabaseError::CorruptRecord(id) => RecordStoreError::Malformed(format!("record {id}")),
            e => RecordStoreError::Transport(e.to_string()),
        }
    }
}
