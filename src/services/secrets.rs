//! Subscription signing secrets.
//!
//! Secrets are generated server-side, shown to the owner once, and stored
//! encrypted with AES-256-GCM. Stored form: `v1:` + base64(nonce || ciphertext).

use crate::error::{WebhookError, WebhookResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;
use std::fmt;

const SECRET_PREFIX: &str = "whsec_";
const SECRET_BYTE_LENGTH: usize = 32;
const HINT_LENGTH: usize = 4;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const CIPHERTEXT_VERSION: &str = "v1:";

pub const ENV_SECRET_KEY: &str = "GREENLEAF_SECRET_KEY";

/// A subscription's shared HMAC secret. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// 32 bytes from the OS-seeded thread RNG, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_BYTE_LENGTH];
        rand::thread_rng().fill(&mut bytes);
        Self(format!("{}{}", SECRET_PREFIX, hex::encode(bytes)))
    }

    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Last few characters, kept in clear for masked display.
    pub fn hint(&self) -> String {
        let start = self.0.len().saturating_sub(HINT_LENGTH);
        self.0[start..].to_string()
    }

    pub fn masked(&self) -> String {
        mask_hint(&self.hint())
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WebhookSecret({})", self.masked())
    }
}

pub fn mask_hint(hint: &str) -> String {
    format!("{}****{}", SECRET_PREFIX, hint)
}

/// Encrypts secrets for storage.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn from_base64(key_b64: &str) -> WebhookResult<Self> {
        let bytes = STANDARD
            .decode(key_b64.trim())
            .map_err(|e| WebhookError::Integrity(format!("invalid base64 secret key: {}", e)))?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            WebhookError::Integrity(format!(
                "secret key must be {} bytes, got {}",
                KEY_SIZE,
                b.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// Resolves the key from the environment first, then from config.
    pub fn from_env_or(configured: Option<&str>) -> WebhookResult<Self> {
        match std::env::var(ENV_SECRET_KEY) {
            Ok(key) if !key.trim().is_empty() => Self::from_base64(&key),
            _ => match configured {
                Some(key) => Self::from_base64(key),
                None => Err(WebhookError::Integrity(format!(
                    "no secret key configured; set {} or [secrets].key (generate one with `greenleaf init`)",
                    ENV_SECRET_KEY
                ))),
            },
        }
    }

    pub fn generate_key_base64() -> String {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill(&mut key);
        STANDARD.encode(key)
    }

    pub fn encrypt(&self, secret: &WebhookSecret) -> WebhookResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, secret.expose().as_bytes())
            .map_err(|e| WebhookError::Integrity(format!("secret encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(format!("{}{}", CIPHERTEXT_VERSION, STANDARD.encode(out)))
    }

    pub fn decrypt(&self, stored: &str) -> WebhookResult<WebhookSecret> {
        let encoded = stored
            .strip_prefix(CIPHERTEXT_VERSION)
            .ok_or_else(|| WebhookError::Integrity("unknown secret ciphertext version".into()))?;
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| WebhookError::Integrity(format!("corrupt secret ciphertext: {}", e)))?;
        if raw.len() <= NONCE_SIZE {
            return Err(WebhookError::Integrity("secret ciphertext too short".into()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| WebhookError::Integrity("secret decryption failed".into()))?;
        let value = String::from_utf8(plaintext)
            .map_err(|_| WebhookError::Integrity("decrypted secret is not UTF-8".into()))?;

        Ok(WebhookSecret(value))
    }
}
