use std::{collections::BTreeMap, sync::Arc};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{config::StripeConfig, webhook, StripeApiError, StripeEvent, StripePaymentIntent};

/// Everything needed to create a payment intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// In the currency's smallest unit, e.g. cents
    pub amount: i64,
    pub currency: String,
    /// Sent as the `Idempotency-Key` header. Stripe returns the original intent when a key is reused.
    pub idempotency_key: String,
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntentRequest {
    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(self.metadata.iter().map(|(k, v)| (format!("metadata[{k}]"), v.clone())));
        form
    }
}

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        if config.secret_key.is_empty() {
            return Err(StripeApiError::Initialization("A Stripe secret key is required".into()));
        }
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Stripe takes form-encoded bodies and answers in JSON.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(String, String)]>,
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending {method} request to {url}");
        let mut req = self.client.request(method, url);
        if let Some(form) = form {
            req = req.form(form);
        }
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestRequestError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<StripePaymentIntent, StripeApiError> {
        let form = request.form();
        let intent = self
            .rest_query::<StripePaymentIntent>(
                Method::POST,
                "/payment_intents",
                Some(&form),
                Some(&request.idempotency_key),
            )
            .await?;
        info!("💳️ Created payment intent {} for {} {}", intent.id, intent.amount, intent.currency);
        Ok(intent)
    }

    pub async fn update_payment_intent_amount(
        &self,
        id: &str,
        amount: i64,
    ) -> Result<StripePaymentIntent, StripeApiError> {
        let form = vec![("amount".to_string(), amount.to_string())];
        let path = format!("/payment_intents/{id}");
        let intent = self.rest_query::<StripePaymentIntent>(Method::POST, &path, Some(&form), None).await?;
        debug!("💳️ Payment intent {id} amount changed to {amount}");
        Ok(intent)
    }

    pub async fn fetch_payment_intent(&self, id: &str) -> Result<StripePaymentIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}");
        self.rest_query::<StripePaymentIntent>(Method::GET, &path, None, None).await
    }

    /// Authenticates a webhook delivery with the configured signing secret.
    pub fn construct_event(&self, payload: &[u8], signature: &str) -> Result<StripeEvent, StripeApiError> {
        webhook::construct_event(
            payload,
            signature,
            self.config.webhook_secret.reveal(),
            self.config.webhook_tolerance,
        )
    }
}
