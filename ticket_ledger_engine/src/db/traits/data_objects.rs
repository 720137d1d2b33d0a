use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};
use tlg_common::Currency;

pub type Fields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Orders,
    Aggregations,
    Constants,
    Purchasers,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Orders, Table::Aggregations, Table::Constants, Table::Purchasers];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Orders => "Orders",
            Table::Aggregations => "Aggregations",
            Table::Constants => "Constants",
            Table::Purchasers => "Purchasers",
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentIntent {
    pub amount: Currency,
    /// Lower-case ISO currency code
    pub currency: String,
    /// Repeating a request with the same key returns the original intent instead of creating a second one.
    pub idempotency_key: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: Currency,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    Created,
    Processing,
    Succeeded,
    PaymentFailed,
    #[serde(untagged)]
    Other(String),
}

impl PaymentEventKind {
    /// Maps a processor event type such as `payment_intent.succeeded` to a kind.
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type.strip_prefix("payment_intent.").unwrap_or(event_type) {
            "created" => Self::Created,
            "processing" => Self::Processing,
            "succeeded" => Self::Succeeded,
            "payment_failed" => Self::PaymentFailed,
            _ => Self::Other(event_type.to_string()),
        }
    }
}

impl Display for PaymentEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentEventKind::Created => write!(f, "created"),
            PaymentEventKind::Processing => write!(f, "processing"),
            PaymentEventKind::Succeeded => write!(f, "succeeded"),
            PaymentEventKind::PaymentFailed => write!(f, "payment_failed"),
            PaymentEventKind::Other(s) => write!(f, "{s}"),
        }
    }
}

/// An authenticated payment lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    pub kind: PaymentEventKind,
    /// The intent the event is about. Unrelated event types may not carry one.
    pub payment_intent_id: Option<String>,
}
