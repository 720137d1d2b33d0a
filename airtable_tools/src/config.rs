use std::time::Duration;

use log::*;
use tlg_common::{parse_env_value, Secret};

pub const DEFAULT_AIRTABLE_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_url: String,
    pub base_id: String,
    pub api_key: Secret<String>,
    /// Applies to every request, including each page of a listing.
    pub timeout: Duration,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_AIRTABLE_URL.to_string(),
            base_id: String::default(),
            api_key: Secret::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AirtableConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("TLG_AIRTABLE_API_URL").unwrap_or_else(|_| DEFAULT_AIRTABLE_URL.to_string());
        let base_id = std::env::var("TLG_AIRTABLE_BASE_ID").unwrap_or_else(|_| {
            warn!("TLG_AIRTABLE_BASE_ID not set. Airtable requests will fail.");
            String::default()
        });
        let api_key = Secret::new(std::env::var("TLG_AIRTABLE_API_KEY").unwrap_or_else(|_| {
            warn!("TLG_AIRTABLE_API_KEY not set. Airtable requests will fail.");
            String::default()
        }));
        let timeout = match parse_env_value::<u64>("TLG_REMOTE_TIMEOUT_SECS") {
            Ok(Some(secs)) => Duration::from_secs(secs),
            Ok(None) => DEFAULT_TIMEOUT,
            Err(e) => {
                warn!("{e}. Using the default timeout of {}s", DEFAULT_TIMEOUT.as_secs());
                DEFAULT_TIMEOUT
            },
        };
        Self { api_url, base_id, api_key, timeout }
    }
}
