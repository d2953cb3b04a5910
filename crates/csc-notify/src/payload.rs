//! # Webhook Payloads
//!
//! Every delivery carries the same JSON envelope:
//!
//! ```json
//! { "eventId": "…", "eventType": "transaction.blocked",
//!   "timestamp": "2025-12-15T09:30:00Z", "data": { … } }
//! ```
//!
//! The body is canonicalized once per event ([`CanonicalBytes`]) so every
//! subscriber receives byte-identical content, and only the signature
//! header differs between subscribers.

use csc_core::CanonicalBytes;
use csc_crypto::sign_payload;
use csc_registry::ComplianceEvent;
use serde::Serialize;
use url::Url;

use crate::error::NotifyError;
use crate::subscription::WebhookSubscription;

/// `sha256=<hex>` signature over the body.
pub const SIGNATURE_HEADER: &str = "X-Csc-Signature";
/// Event type name.
pub const EVENT_HEADER: &str = "X-Csc-Event";
/// Event identifier.
pub const EVENT_ID_HEADER: &str = "X-Csc-Event-Id";
/// Event timestamp, ISO 8601.
pub const TIMESTAMP_HEADER: &str = "X-Csc-Timestamp";

/// The JSON envelope delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Event identifier.
    pub event_id: String,
    /// Event type name.
    pub event_type: String,
    /// Occurrence time, ISO 8601.
    pub timestamp: String,
    /// Event-specific data.
    pub data: serde_json::Value,
}

impl WebhookPayload {
    /// Build the envelope for an event.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Payload`] if the event data cannot be serialized.
    pub fn from_event(event: &ComplianceEvent) -> Result<Self, NotifyError> {
        Ok(Self {
            event_id: event.event_id.to_string(),
            event_type: event.event_type().to_string(),
            timestamp: event.occurred_at.to_iso8601(),
            data: event.payload.data()?,
        })
    }

    /// Canonical body bytes.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Canonicalization`] if the envelope cannot be canonicalized.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, NotifyError> {
        Ok(CanonicalBytes::new(self)?)
    }
}

/// A prepared event: envelope metadata plus the canonical body shared by
/// every subscriber.
#[derive(Debug, Clone)]
pub struct PreparedEvent {
    payload: WebhookPayload,
    body: CanonicalBytes,
}

impl PreparedEvent {
    /// Build and canonicalize the envelope for `event`.
    ///
    /// # Errors
    ///
    /// See [`WebhookPayload::from_event`] and [`WebhookPayload::canonical_bytes`].
    pub fn new(event: &ComplianceEvent) -> Result<Self, NotifyError> {
        let payload = WebhookPayload::from_event(event)?;
        let body = payload.canonical_bytes()?;
        Ok(Self { payload, body })
    }

    /// The envelope.
    pub fn payload(&self) -> &WebhookPayload {
        &self.payload
    }

    /// The canonical body.
    pub fn body(&self) -> &CanonicalBytes {
        &self.body
    }

    /// Sign the body for one subscriber and assemble the request.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Crypto`] if the subscriber's secret cannot sign.
    pub fn request_for(&self, subscription: &WebhookSubscription) -> Result<WebhookRequest, NotifyError> {
        let signature = sign_payload(&subscription.secret, &self.body)?;
        Ok(WebhookRequest {
            url: subscription.callback_url.clone(),
            body: self.body.as_bytes().to_vec(),
            headers: vec![
                (SIGNATURE_HEADER, signature),
                (EVENT_HEADER, self.payload.event_type.clone()),
                (EVENT_ID_HEADER, self.payload.event_id.clone()),
                (TIMESTAMP_HEADER, self.payload.timestamp.clone()),
            ],
        })
    }
}

/// One HTTP POST to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    /// Target URL.
    pub url: Url,
    /// JSON body.
    pub body: Vec<u8>,
    /// Extra headers; `Content-Type` is set by the transport.
    pub headers: Vec<(&'static str, String)>,
}

impl WebhookRequest {
    /// Header value by name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
