//! # Webhook Signing Secrets
//!
//! A [`WebhookSecret`] is the shared key between the dispatcher and one
//! subscriber. It is validated at construction, redacted in `Debug`, and
//! zeroized when dropped. It deliberately has no `Serialize` impl, so a
//! subscription record can never leak its key through a JSON dump.

use serde::{Deserialize, Deserializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Minimum accepted secret length, in characters.
pub const MIN_SECRET_LEN: usize = 32;

/// A subscriber's HMAC signing secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Wrap a secret, enforcing the minimum length.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SecretTooShort`] if the secret has fewer than
    /// [`MIN_SECRET_LEN`] characters.
    pub fn new(secret: impl Into<String>) -> Result<Self, CryptoError> {
        let mut secret = secret.into();
        let actual = secret.chars().count();
        if actual < MIN_SECRET_LEN {
            secret.zeroize();
            return Err(CryptoError::SecretTooShort {
                min: MIN_SECRET_LEN,
                actual,
            });
        }
        Ok(Self(secret))
    }

    /// Raw key bytes for MAC computation.
    pub fn expose_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for WebhookSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
