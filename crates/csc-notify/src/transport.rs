//! HTTP delivery of webhook requests.
//!
//! [`WebhookTransport`] is the seam the dispatcher retries against. A
//! delivery succeeds only on a 2xx response; every other outcome is a
//! [`TransportError`] and counts as a failed attempt.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{NotifyError, TransportError};
use crate::payload::WebhookRequest;

/// Sends one request to one subscriber.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Deliver `request`.
    async fn deliver(&self, request: &WebhookRequest) -> Result<(), TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpWebhookTransport {
    http: reqwest::Client,
}

impl HttpWebhookTransport {
    /// Build a transport with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Client`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("csc-notify/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookTransport {
    async fn deliver(&self, request: &WebhookRequest) -> Result<(), TransportError> {
        let mut builder = self
            .http
            .post(request.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(url = %request.url, status = status.as_u16(), "webhook delivered");
            Ok(())
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
            })
        }
    }
}
