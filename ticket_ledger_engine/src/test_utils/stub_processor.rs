use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tlg_common::Currency;

use crate::db::traits::{NewPaymentIntent, PaymentEvent, PaymentIntent, PaymentProcessor, ProcessorError};

/// The only signature header [`StubPaymentProcessor`] accepts.
pub const STUB_SIGNATURE: &str = "t=0,v1=stub";

#[derive(Debug, Default)]
struct StubState {
    intents: HashMap<String, PaymentIntent>,
    by_idempotency_key: HashMap<String, String>,
    created: usize,
    amount_updates: Vec<(String, Currency)>,
}

/// An in-memory payment processor. Intents are numbered `pi_1`, `pi_2`, ... and idempotency keys are honoured.
/// Events are the JSON form of [`PaymentEvent`] and must carry [`STUB_SIGNATURE`].
#[derive(Debug, Clone, Default)]
pub struct StubPaymentProcessor {
    state: Arc<Mutex<StubState>>,
}

impl StubPaymentProcessor {
    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("stub processor lock poisoned")
    }

    /// Number of intents actually created, i.e. not returned from an idempotency key.
    pub fn intents_created(&self) -> usize {
        self.state().created
    }

    pub fn amount_updates(&self) -> Vec<(String, Currency)> {
        self.state().amount_updates.clone()
    }

    pub fn intent(&self, id: &str) -> Option<PaymentIntent> {
        self.state().intents.get(id).cloned()
    }

    /// A signed webhook payload for `kind` on intent `intent_id`.
    pub fn event_payload(event_id: &str, kind: &str, intent_id: &str) -> Vec<u8> {
        serde_json::json!({ "id": event_id, "kind": kind, "payment_intent_id": intent_id }).to_string().into_bytes()
    }
}

impl PaymentProcessor for StubPaymentProcessor {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, ProcessorError> {
        let mut state = self.state();
        if let Some(existing) = state.by_idempotency_key.get(&intent.idempotency_key) {
            let existing = existing.clone();
            return state.intents.get(&existing).cloned().ok_or_else(|| ProcessorError::Rejected(existing));
        }
        state.created += 1;
        let id = format!("pi_{}", state.created);
        let created = PaymentIntent {
            id: id.clone(),
            client_secret: format!("{id}_secret"),
            amount: intent.amount,
            status: "requires_payment_method".into(),
        };
        state.intents.insert(id.clone(), created.clone());
        state.by_idempotency_key.insert(intent.idempotency_key, id);
        Ok(created)
    }

    async fn update_payment_intent_amount(&self, id: &str, amount: Currency) -> Result<PaymentIntent, ProcessorError> {
        let mut state = self.state();
        state.amount_updates.push((id.to_string(), amount));
        let intent = state.intents.get_mut(id).ok_or_else(|| ProcessorError::Rejected(format!("No such intent {id}")))?;
        intent.amount = amount;
        Ok(intent.clone())
    }

    async fn fetch_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProcessorError> {
        self.intent(id).ok_or_else(|| ProcessorError::Rejected(format!("No such intent {id}")))
    }

    fn construct_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent, ProcessorError> {
        if signature != STUB_SIGNATURE {
            return Err(ProcessorError::InvalidSignature("signature mismatch".into()));
        }
        serde_json::from_slice(payload).map_err(|e| ProcessorError::MalformedEvent(e.to_string()))
    }
}
