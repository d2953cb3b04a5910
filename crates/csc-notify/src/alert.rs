//! Operator alerts raised when the circuit breaker deactivates a subscription.

use async_trait::async_trait;
use csc_core::{SubscriptionId, Timestamp};
use parking_lot::Mutex;
use url::Url;

use crate::error::NotifyError;
use crate::subscription::WebhookSubscription;

/// A critical alert: a subscriber has been cut off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorAlert {
    /// Deactivated subscription.
    pub subscription_id: SubscriptionId,
    /// Its owner.
    pub integration_system: String,
    /// Its delivery target.
    pub callback_url: Url,
    /// Failure count at deactivation.
    pub consecutive_failures: u32,
    /// When the alert was raised.
    pub raised_at: Timestamp,
}

impl OperatorAlert {
    /// Alert for a just-deactivated subscription.
    pub fn deactivated(subscription: &WebhookSubscription, raised_at: Timestamp) -> Self {
        Self {
            subscription_id: subscription.id,
            integration_system: subscription.integration_system.clone(),
            callback_url: subscription.callback_url.clone(),
            consecutive_failures: subscription.consecutive_failures,
            raised_at,
        }
    }
}

/// Destination for operator alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Raise one alert.
    async fn raise(&self, alert: OperatorAlert) -> Result<(), NotifyError>;
}

/// Logs alerts at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn raise(&self, alert: OperatorAlert) -> Result<(), NotifyError> {
        tracing::error!(
            subscription = %alert.subscription_id,
            integration_system = %alert.integration_system,
            target = %alert.callback_url,
            consecutive_failures = alert.consecutive_failures,
            "webhook subscription deactivated after repeated delivery failures"
        );
        Ok(())
    }
}

/// Keeps alerts in memory.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<OperatorAlert>>,
}

impl RecordingAlertSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts raised so far.
    pub fn alerts(&self) -> Vec<OperatorAlert> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn raise(&self, alert: OperatorAlert) -> Result<(), NotifyError> {
        self.alerts.lock().push(alert);
        Ok(())
    }
}
