use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    /// Amount in the currency's smallest unit
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

impl StripeEvent {
    /// The payment intent this event is about, if its object is a payment intent.
    pub fn payment_intent_id(&self) -> Option<&str> {
        let object = &self.data.object;
        match object["object"].as_str() {
            Some("payment_intent") => object["id"].as_str(),
            _ => None,
        }
    }
}
