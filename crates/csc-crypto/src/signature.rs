//! # HMAC-SHA256 Payload Signatures
//!
//! The signature header value is `sha256=` followed by the lowercase hex
//! HMAC-SHA256 of the canonical payload bytes, keyed with the subscriber's
//! [`WebhookSecret`].
//!
//! ## Verification
//!
//! Receivers recompute the signature over the bytes they received and
//! compare against the header. The comparison lowercases the supplied
//! header first (hex digits and prefix alike) and uses `subtle` so the
//! time taken does not depend on where the first differing byte is.

use csc_core::CanonicalBytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;
use crate::secret::WebhookSecret;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of every signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Sign canonical payload bytes, returning `sha256=<lowercase hex>`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the secret cannot key the MAC.
pub fn sign_payload(secret: &WebhookSecret, payload: &CanonicalBytes) -> Result<String, CryptoError> {
    sign_bytes(secret, payload.as_bytes())
}

/// Sign raw bytes as received off the wire.
///
/// Receivers hold the body bytes rather than [`CanonicalBytes`]; the
/// dispatcher always goes through [`sign_payload`].
pub fn sign_bytes(secret: &WebhookSecret, body: &[u8]) -> Result<String, CryptoError> {
    Ok(format!("{SIGNATURE_PREFIX}{}", hex::encode(mac_bytes(secret, body)?)))
}

/// Verify a signature header against a received body.
///
/// # Errors
///
/// - [`CryptoError::MalformedSignature`] if the header does not start with
///   `sha256=` (case-insensitive).
/// - [`CryptoError::SignatureMismatch`] if the digest differs.
/// - [`CryptoError::InvalidKey`] if the secret cannot key the MAC.
pub fn verify_signature(
    secret: &WebhookSecret,
    body: &[u8],
    header: &str,
) -> Result<(), CryptoError> {
    let supplied = header.trim().to_ascii_lowercase();
    let Some(supplied_hex) = supplied.strip_prefix(SIGNATURE_PREFIX) else {
        return Err(CryptoError::MalformedSignature(header.to_string()));
    };
    let expected = hex::encode(mac_bytes(secret, body)?);
    if bool::from(expected.as_bytes().ct_eq(supplied_hex.as_bytes())) {
        Ok(())
    } else {
        Err(CryptoError::SignatureMismatch)
    }
}

fn mac_bytes(secret: &WebhookSecret, body: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_bytes())
        .map_err(|err| CryptoError::InvalidKey(err.to_string()))?;
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}
