use std::fmt::Debug;

use log::*;
use sqlx::{migrate, Row, SqlitePool};

use super::{db_url, new_pool, SqliteDatabaseError};
use crate::db::traits::{Fields, RecordStore, RecordStoreError, StoreRecord, Table};

#[derive(Clone)]
pub struct SqliteRecordStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteRecordStore ({})", self.url)
    }
}

impl SqliteRecordStore {
    /// Connects to the database at `TLG_DATABASE_URL` (or the default location).
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Record store migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }

    fn to_record(id: String, fields: &str) -> Result<StoreRecord, SqliteDatabaseError> {
        match serde_json::from_str::<serde_json::Value>(fields) {
            Ok(serde_json::Value::Object(fields)) => Ok(StoreRecord { id, fields }),
            _ => Err(SqliteDatabaseError::CorruptRecord(id)),
        }
    }

    async fn fetch_records(
        &self,
        table: Table,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<StoreRecord>, SqliteDatabaseError> {
        let rows = match filter {
            Some((field, value)) => {
                // JSON path for a key that may contain spaces, e.g. $."Payment Status"
                let path = format!("$.\"{field}\"");
                sqlx::query(
                    "SELECT id, fields FROM records WHERE table_name = $1 AND CAST(json_extract(fields, $2) AS TEXT) \
                     = $3 ORDER BY rowid",
                )
                .bind(table.name())
                .bind(path)
                .bind(value)
                .fetch_all(&self.pool)
                .await?
            },
            None => {
                sqlx::query("SELECT id, fields FROM records WHERE table_name = $1 ORDER BY rowid")
                    .bind(table.name())
                    .fetch_all(&self.pool)
                    .await?
            },
        };
        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let fields: String = row.try_get("fields")?;
                Self::to_record(id, &fields)
            })
            .collect()
    }
}

impl RecordStore for SqliteRecordStore {
    async fn query(&self, table: Table, field: &str, value: &str) -> Result<Vec<StoreRecord>, RecordStoreError> {
        let records = self.fetch_records(table, Some((field, value))).await?;
        trace!("🗃️ {} {table} records where {field} = '{value}'", records.len());
        Ok(records)
    }

    async fn list(&self, table: Table) -> Result<Vec<StoreRecord>, RecordStoreError> {
        Ok(self.fetch_records(table, None).await?)
    }

    async fn create(&self, table: Table, fields: Fields) -> Result<String, RecordStoreError> {
        let id = format!("rec{}", uuid::Uuid::new_v4().simple());
        let json = serde_json::Value::Object(fields).to_string();
        sqlx::query("INSERT INTO records (id, table_name, fields) VALUES ($1, $2, $3)")
            .bind(&id)
            .bind(table.name())
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(SqliteDatabaseError::from)?;
        debug!("🗃️ Created {table} record {id}");
        Ok(id)
    }

    async fn update_partial(&self, table: Table, id: &str, fields: Fields) -> Result<(), RecordStoreError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let stored: Option<String> = sqlx::query_scalar("SELECT fields FROM records WHERE id = $1 AND table_name = $2")
            .bind(id)
            .bind(table.name())
            .fetch_optional(&mut *tx)
            .await
            .map_err(SqliteDatabaseError::from)?;
        let stored = stored.ok_or_else(|| SqliteDatabaseError::RecordNotFound(id.to_string()))?;
        let mut record = Self::to_record(id.to_string(), &stored)?;
        record.fields.extend(fields);
        let json = serde_json::Value::Object(record.fields).to_string();
        sqlx::query("UPDATE records SET fields = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(json)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(SqliteDatabaseError::from)?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        trace!("🗃️ Updated {table} record {id}");
        Ok(())
    }
}
