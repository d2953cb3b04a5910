//! # csc-notify — Webhook Notifications for Compliance Events
//!
//! Delivers [`ComplianceEvent`](csc_registry::ComplianceEvent)s to external
//! integration systems:
//!
//! - [`subscription`]: who wants which events, where, signed with which
//!   secret, plus failure bookkeeping.
//! - [`payload`]: the canonical JSON envelope and signed request headers.
//! - [`transport`]: the async delivery seam and its `reqwest` implementation.
//! - [`dispatcher`]: bounded fan-out, retry schedule, shutdown-aware
//!   delays, and the circuit breaker.
//! - [`alert`]: operator alerts when a subscription is cut off.
//! - [`store`]: subscription persistence.
//!
//! Delivery is at-least-once and best-effort. Receivers deduplicate on
//! the `X-Csc-Event-Id` header.

pub mod alert;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod store;
pub mod subscription;
pub mod transport;

pub use alert::{AlertSink, OperatorAlert, RecordingAlertSink, TracingAlertSink};
pub use config::DispatcherConfig;
pub use dispatcher::{
    DeliveryOutcome, DeliveryReport, DispatchReport, NotificationDispatcher, ShutdownSignal,
    ShutdownTrigger,
};
pub use error::{ConfigError, NotifyError, TransportError};
pub use payload::{
    PreparedEvent, WebhookPayload, WebhookRequest, EVENT_HEADER, EVENT_ID_HEADER,
    SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
pub use store::{InMemorySubscriptionStore, SubscriptionRepository};
pub use subscription::{FailureRecorded, WebhookSubscription};
pub use transport::{HttpWebhookTransport, WebhookTransport};
