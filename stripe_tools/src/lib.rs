mod api;
mod config;
mod error;
mod webhook;

mod data_objects;

pub use api::{PaymentIntentRequest, StripeApi};
pub use config::StripeConfig;
pub use data_objects::{EventData, StripeEvent, StripePaymentIntent};
pub use error::StripeApiError;
pub use webhook::{construct_event, sign_payload, verify_signature, SIGNATURE_HEADER};
