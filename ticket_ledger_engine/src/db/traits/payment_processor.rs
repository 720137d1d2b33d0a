use thiserror::Error;
use tlg_common::Currency;

use crate::db::traits::{NewPaymentIntent, PaymentEvent, PaymentIntent};

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("Could not reach the payment processor: {0}")]
    Transport(String),
    #[error("The payment processor rejected the request: {0}")]
    Rejected(String),
    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(String),
    #[error("Could not understand payment event: {0}")]
    MalformedEvent(String),
}

#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, ProcessorError>;

    async fn update_payment_intent_amount(&self, id: &str, amount: Currency) -> Result<PaymentIntent, ProcessorError>;

    async fn fetch_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProcessorError>;

    /// Authenticates a webhook delivery and parses it. Implementations must verify `signature` against the raw
    /// `payload` before looking at its contents.
    fn construct_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent, ProcessorError>;
}
