//! HMAC-SHA256 payload signing.
//!
//! The signature covers the exact bytes sent as the request body. Receivers
//! recompute it over the raw body they got and compare in constant time.

use crate::error::{WebhookError, WebhookResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const EVENT_HEADER: &str = "X-Webhook-Event";
pub const ID_HEADER: &str = "X-Webhook-Id";
pub const ATTEMPT_HEADER: &str = "X-Webhook-Attempt";

/// Lowercase hex HMAC-SHA256 of `payload` keyed by `secret`.
pub fn sign(payload: &[u8], secret: &str) -> WebhookResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::Integrity(format!("unusable signing key: {}", e)))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Receiver-side check of a hex signature header against the raw body.
pub fn verify(payload: &[u8], secret: &str, signature: &str) -> bool {
    let expected = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
