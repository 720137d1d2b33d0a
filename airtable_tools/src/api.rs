use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{
    config::AirtableConfig,
    data_objects::{NewRecord, RecordUpdate, WriteRequest},
    helpers::equals_formula,
    AirtableApiError,
    AirtableRecord,
    RecordList,
};

/// Airtable returns at most this many records per page.
const PAGE_SIZE: &str = "100";

#[derive(Clone)]
pub struct AirtableApi {
    config: AirtableConfig,
    client: Arc<Client>,
}

impl AirtableApi {
    pub fn new(config: AirtableConfig) -> Result<Self, AirtableApiError> {
        if config.api_key.is_empty() || config.base_id.is_empty() {
            return Err(AirtableApiError::Initialization("An Airtable API key and base id are required".into()));
        }
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| AirtableApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AirtableApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.config.api_url.trim_end_matches('/'), self.config.base_id, table)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        table: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, AirtableApiError> {
        let url = self.url(table);
        trace!("🗃️ Sending {method} request to {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| AirtableApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🗃️ Request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| AirtableApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| AirtableApiError::RestRequestError(e.to_string()))?;
            Err(AirtableApiError::QueryError { status, message })
        }
    }

    /// Every record in `table`, optionally filtered by an Airtable formula. Follows the pagination offset until the
    /// last page.
    pub async fn list_records(&self, table: &str, formula: Option<&str>) -> Result<Vec<AirtableRecord>, AirtableApiError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut params = vec![("pageSize", PAGE_SIZE)];
            if let Some(formula) = formula {
                params.push(("filterByFormula", formula));
            }
            if let Some(offset) = offset.as_deref() {
                params.push(("offset", offset));
            }
            let page = self.rest_query::<RecordList, ()>(Method::GET, table, &params, None).await?;
            records.extend(page.records);
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        debug!("🗃️ Fetched {} records from {table}", records.len());
        Ok(records)
    }

    /// Records in `table` whose `field`, read as text, equals `value`.
    pub async fn find_records(
        &self,
        table: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<AirtableRecord>, AirtableApiError> {
        let formula = equals_formula(field, value);
        self.list_records(table, Some(&formula)).await
    }

    pub async fn create_record(&self, table: &str, fields: &Map<String, Value>) -> Result<AirtableRecord, AirtableApiError> {
        let body = WriteRequest { records: vec![NewRecord { fields }], typecast: true };
        let result = self.rest_query::<RecordList, _>(Method::POST, table, &[], Some(body)).await?;
        let record = result.records.into_iter().next().ok_or(AirtableApiError::EmptyResponse)?;
        info!("🗃️ Created record {} in {table}", record.id);
        Ok(record)
    }

    /// Updates only the given fields of record `id`.
    pub async fn update_record(
        &self,
        table: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<AirtableRecord, AirtableApiError> {
        let body = WriteRequest { records: vec![RecordUpdate { id, fields }], typecast: true };
        let result = self.rest_query::<RecordList, _>(Method::PATCH, table, &[], Some(body)).await?;
        let record = result.records.into_iter().next().ok_or(AirtableApiError::EmptyResponse)?;
        debug!("🗃️ Updated record {id} in {table}");
        Ok(record)
    }
}
