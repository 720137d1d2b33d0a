//! Stripe webhook signatures.
//!
//! Stripe signs every webhook delivery. The `Stripe-Signature` header looks like `t=1492774577,v1=5257a8...` where
//! `t` is a unix timestamp and each `v1` is a hex encoded HMAC-SHA256 of `"{t}.{raw body}"` keyed with the endpoint's
//! signing secret. More than one `v1` may be present while a secret is being rolled.
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::{StripeApiError, StripeEvent};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

type HmacSha256 = Hmac<Sha256>;

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, StripeApiError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| StripeApiError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Produces a complete signature header for `payload`, as Stripe would.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, StripeApiError> {
    let signature = signed_mac(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={timestamp},v1={}", hex::encode(signature)))
}

/// Checks `header` against `payload`. `now` is a unix timestamp; signatures more than `tolerance` away from it are
/// rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), StripeApiError> {
    if secret.trim().is_empty() {
        return Err(StripeApiError::InvalidSignature("no webhook secret is configured".into()));
    }
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for (key, value) in header.split(',').filter_map(|part| part.trim().split_once('=')) {
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.push(value),
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| StripeApiError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(StripeApiError::InvalidSignature("no v1 signature".into()));
    }
    let age = now.saturating_sub(timestamp).unsigned_abs();
    if age > tolerance.as_secs() {
        return Err(StripeApiError::InvalidSignature(format!("timestamp is {age}s away from now")));
    }
    let mac = signed_mac(secret, timestamp, payload)?;
    let valid = signatures
        .into_iter()
        .filter_map(|s| hex::decode(s).ok())
        .any(|s| mac.clone().verify_slice(&s).is_ok());
    if valid {
        trace!("🔐️ Webhook signature verified ✅️");
        Ok(())
    } else {
        warn!("🔐️ Webhook signature does not match");
        Err(StripeApiError::InvalidSignature("signature mismatch".into()))
    }
}

/// Verifies the signature and parses the event. Nothing in `payload` is trusted until the signature checks out.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
) -> Result<StripeEvent, StripeApiError> {
    verify_signature(payload, header, secret, tolerance, Utc::now().timestamp())?;
    serde_json::from_slice(payload).map_err(|e| StripeApiError::MalformedEvent(e.to_string()))
}
