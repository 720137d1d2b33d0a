use std::time::Duration;

use log::*;
use tlg_common::{parse_env_value, Secret};

pub const DEFAULT_STRIPE_URL: &str = "https://api.stripe.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// How old a webhook signature may be before it is rejected as a possible replay.
pub const DEFAULT_WEBHOOK_TOLERANCE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub webhook_tolerance: Duration,
    pub timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_STRIPE_URL.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            webhook_tolerance: DEFAULT_WEBHOOK_TOLERANCE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("TLG_STRIPE_API_URL").unwrap_or_else(|_| DEFAULT_STRIPE_URL.to_string());
        let secret_key = Secret::new(std::env::var("TLG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("TLG_STRIPE_SECRET_KEY not set. Payment intents cannot be created.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("TLG_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("TLG_STRIPE_WEBHOOK_SECRET not set. Every webhook will be rejected.");
            String::default()
        }));
        let webhook_tolerance = secs_from_env("TLG_STRIPE_WEBHOOK_TOLERANCE_SECS", DEFAULT_WEBHOOK_TOLERANCE);
        let timeout = secs_from_env("TLG_REMOTE_TIMEOUT_SECS", DEFAULT_TIMEOUT);
        Self { api_url, secret_key, webhook_secret, webhook_tolerance, timeout }
    }
}

fn secs_from_env(name: &str, default: Duration) -> Duration {
    match parse_env_value::<u64>(name) {
        Ok(Some(secs)) => Duration::from_secs(secs),
        Ok(None) => default,
        Err(e) => {
            warn!("{e}. Using the default of {}s", default.as_secs());
            default
        },
    }
}
