//! An Airtable base as the ledger's [`RecordStore`].
//!
//! Each ledger table maps to a table in the base, by name. Airtable has no transactions, so this adapter is a thin
//! translation layer: every call is one (or, for listings, one per page) REST request.
use airtable_tools::{AirtableApi, AirtableApiError, AirtableRecord};
use log::*;
use ticket_ledger_engine::traits::{Fields, RecordStore, RecordStoreError, StoreRecord, Table};

use crate::config::AirtableSettings;

#[derive(Clone)]
pub struct AirtableRecordStore {
    api: AirtableApi,
    settings: AirtableSettings,
}

impl AirtableRecordStore {
    pub fn new(settings: AirtableSettings) -> Result<Self, AirtableApiError> {
        let api = AirtableApi::new(settings.api.clone())?;
        info!("🗃️ Using Airtable base {}", settings.api.base_id);
        Ok(Self { api, settings })
    }

    fn table(&self, table: Table) -> &str {
        self.settings.table_name(table)
    }
}

impl RecordStore for AirtableRecordStore {
    async fn query(&self, table: Table, field: &str, value: &str) -> Result<Vec<StoreRecord>, RecordStoreError> {
        let records = self.api.find_records(self.table(table), field, value).await.map_err(|e| store_error(e, None))?;
        Ok(records.into_iter().map(to_store_record).collect())
    }

    async fn list(&self, table: Table) -> Result<Vec<StoreRecord>, RecordStoreError> {
        let records = self.api.list_records(self.table(table), None).await.map_err(|e| store_error(e, None))?;
        Ok(records.into_iter().map(to_store_record).collect())
    }

    async fn create(&self, table: Table, fields: Fields) -> Result<String, RecordStoreError> {
        let record = self.api.create_record(self.table(table), &fields).await.map_err(|e| store_error(e, None))?;
        Ok(record.id)
    }

    async fn update_partial(&self, table: Table, id: &str, fields: Fields) -> Result<(), RecordStoreError> {
        self.api.update_record(self.table(table), id, &fields).await.map_err(|e| store_error(e, Some(id)))?;
        Ok(())
    }
}

fn to_store_record(record: AirtableRecord) -> StoreRecord {
    StoreRecord { id: record.id, fields: record.fields }
}

fn store_error(e: AirtableApiError, record_id: Option<&str>) -> RecordStoreError {
    if e.is_transport() {
        return RecordStoreError::Transport(e.to_string());
    }
    match (e, record_id) {
        (AirtableApiError::QueryError { status: 404, .. }, Some(id)) => {
            RecordStoreError::RecordNotFound(id.to_string())
        },
        (AirtableApiError::QueryError { message, .. }, Some(id)) if message.contains("ROW_DOES_NOT_EXIST") => {
            RecordStoreError::RecordNotFound(id.to_string())
        },
        (AirtableApiError::JsonError(s), _) => RecordStoreError::Malformed(s),
        (AirtableApiError::Initialization(s), _) => RecordStoreError::Transport(s),
        (e, _) => RecordStoreError::Rejected(e.to_string()),
    }
}
