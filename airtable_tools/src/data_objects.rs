use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// One page of a record listing. `offset` is present when there are more pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordList {
    #[serde(default)]
    pub records: Vec<AirtableRecord>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewRecord<'a> {
    pub fields: &'a Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RecordUpdate<'a> {
    pub id: &'a str,
    pub fields: &'a Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WriteRequest<R> {
    pub records: Vec<R>,
    pub typecast: bool,
}
