//! # Webhook Subcommand
//!
//! Computes and checks `X-Csc-Signature` values, for operators wiring up a
//! new subscriber or debugging a rejected delivery.
//!
//! ```bash
//! export CSC_WEBHOOK_SECRET=whsec_...
//! csc webhook sign --body event.json
//! csc webhook verify --body received.bin --signature sha256=3f1c...
//! ```
//!
//! `sign` canonicalizes the JSON document first, exactly as the dispatcher
//! does, and prints the canonical body on stderr when `-v` is given.
//! `verify` checks the bytes as received, without re-canonicalizing.
//! The secret is read from an environment variable, never from argv.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use csc_core::CanonicalBytes;
use csc_crypto::{sign_payload, verify_signature, CryptoError, WebhookSecret};

/// Arguments for `csc webhook`.
#[derive(Args, Debug)]
pub struct WebhookArgs {
    /// Environment variable holding the signing secret.
    #[arg(long, global = true, default_value = "CSC_WEBHOOK_SECRET")]
    pub secret_env: String,

    #[command(subcommand)]
    pub command: WebhookCommand,
}

/// Webhook operations.
#[derive(Subcommand, Debug)]
pub enum WebhookCommand {
    /// Canonicalize a JSON payload and print its signature.
    Sign {
        /// JSON payload file.
        #[arg(long)]
        body: PathBuf,
    },
    /// Verify a signature header against a received body.
    Verify {
        /// Raw body file, as received.
        #[arg(long)]
        body: PathBuf,
        /// Signature header value (`sha256=<hex>`).
        #[arg(long)]
        signature: String,
    },
}

/// Execute `csc webhook`.
pub fn run_webhook(args: &WebhookArgs) -> Result<u8> {
    let secret = load_secret(&args.secret_env)?;
    match &args.command {
        WebhookCommand::Sign { body } => {
            println!("{}", sign_file(&secret, body)?);
            Ok(0)
        }
        WebhookCommand::Verify { body, signature } => {
            if verify_file(&secret, body, signature)? {
                println!("valid");
                Ok(0)
            } else {
                println!("invalid");
                Ok(1)
            }
        }
    }
}

fn load_secret(var: &str) -> Result<WebhookSecret> {
    let raw = std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?;
    WebhookSecret::new(raw).with_context(|| format!("secret in {var} is unusable"))
}

/// Canonicalize the JSON at `path` and sign it.
pub fn sign_file(secret: &WebhookSecret, path: &Path) -> Result<String> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_slice(&raw).with_context(|| format!("invalid JSON in {}", path.display()))?;
    let canonical = CanonicalBytes::new(&value).context("payload cannot be canonicalized")?;
    tracing::debug!(body = %String::from_utf8_lossy(canonical.as_bytes()), "canonical body");
    sign_payload(secret, &canonical).context("payload cannot be signed")
}

/// Verify `header` over the bytes at `path`. Malformed headers are errors;
/// a well-formed mismatch is `Ok(false)`.
pub fn verify_file(secret: &WebhookSecret, path: &Path, header: &str) -> Result<bool> {
    let body = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    match verify_signature(secret, &body, header) {
        Ok(()) => Ok(true),
        Err(CryptoError::SignatureMismatch) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
