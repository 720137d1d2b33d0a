//! A [`RecordStore`](crate::db::traits::RecordStore) backed by a local SQLite file.
//!
//! Records are stored as JSON documents in a single `records` table, which keeps the loose, schemaless behaviour of a
//! hosted record store while letting the ledger run (and be tested) without network access.
mod errors;
mod record_store;

use std::env;

pub use errors::SqliteDatabaseError;
use log::info;
pub use record_store::SqliteRecordStore;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

const SQLITE_DB_URL: &str = "sqlite://data/ticket_ledger.db";

pub fn db_url() -> String {
    let result = env::var("TLG_DATABASE_URL").unwrap_or_else(|_| {
        info!("TLG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
