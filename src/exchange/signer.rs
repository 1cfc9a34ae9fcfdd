//! Request signing for the exchange API
//!
//! The signing scheme is pluggable through [`RequestSigner`]. The default
//! [`HmacSha256Signer`] produces base64(HMAC-SHA256(secret, prehash)) using
//! the `hmac`/`sha2` crates.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Produces the `OK-ACCESS-SIGN` value for a request
pub trait RequestSigner: Send + Sync {
    /// Sign the prehash string `timestamp + method + request_path + body`
    fn sign(&self, prehash: &str) -> Result<String>;
}

/// HMAC-SHA256 signer keyed by the API secret
pub struct HmacSha256Signer {
    secret: String,
}

impl HmacSha256Signer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for HmacSha256Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Signer")
            .field("secret", &"***")
            .finish()
    }
}

impl RequestSigner for HmacSha256Signer {
    fn sign(&self, prehash: &str) -> Result<String> {
        if self.secret.is_empty() {
            return Err(Error::Auth("API secret not configured".to_string()));
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Auth(format!("Invalid API secret: {}", e)))?;
        mac.update(prehash.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Build the string the exchange expects to be signed
pub fn prehash(timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
    format!("{}{}{}{}", timestamp, method.to_uppercase(), request_path, body)
}
