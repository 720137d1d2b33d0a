//! Stripe as the ledger's [`PaymentProcessor`].
use log::*;
use stripe_tools::{PaymentIntentRequest, StripeApi, StripeApiError, StripeConfig, StripePaymentIntent};
use ticket_ledger_engine::traits::{
    NewPaymentIntent,
    PaymentEvent,
    PaymentEventKind,
    PaymentIntent,
    PaymentProcessor,
    ProcessorError,
};
use tlg_common::Currency;

#[derive(Clone)]
pub struct StripePaymentProcessor {
    api: StripeApi,
}

impl StripePaymentProcessor {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let api = StripeApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentProcessor for StripePaymentProcessor {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, ProcessorError> {
        let request = PaymentIntentRequest {
            amount: intent.amount.to_minor_units(),
            currency: intent.currency,
            idempotency_key: intent.idempotency_key,
            metadata: intent.metadata,
        };
        let intent = self.api.create_payment_intent(&request).await.map_err(processor_error)?;
        Ok(to_payment_intent(intent))
    }

    async fn update_payment_intent_amount(&self, id: &str, amount: Currency) -> Result<PaymentIntent, ProcessorError> {
        let intent = self.api.update_payment_intent_amount(id, amount.to_minor_units()).await.map_err(processor_error)?;
        Ok(to_payment_intent(intent))
    }

    async fn fetch_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProcessorError> {
        let intent = self.api.fetch_payment_intent(id).await.map_err(processor_error)?;
        Ok(to_payment_intent(intent))
    }

    fn construct_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent, ProcessorError> {
        let event = self.api.construct_event(payload, signature).map_err(processor_error)?;
        let kind = PaymentEventKind::from_event_type(&event.event_type);
        let payment_intent_id = event.payment_intent_id().map(String::from);
        trace!("💳️ Webhook event {} ({kind}) for {payment_intent_id:?}", event.id);
        Ok(PaymentEvent { id: event.id, kind, payment_intent_id })
    }
}

fn to_payment_intent(intent: StripePaymentIntent) -> PaymentIntent {
    PaymentIntent {
        id: intent.id,
        client_secret: intent.client_secret.unwrap_or_default(),
        amount: Currency::from_minor_units(intent.amount),
        status: intent.status,
    }
}

fn processor_error(e: StripeApiError) -> ProcessorError {
    match e {
        StripeApiError::InvalidSignature(s) => ProcessorError::InvalidSignature(s),
        StripeApiError::MalformedEvent(s) => ProcessorError::MalformedEvent(s),
        e if e.is_transport() => ProcessorError::Transport(e.to_string()),
        e => ProcessorError::Rejected(e.to_string()),
    }
}
