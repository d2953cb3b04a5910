//! # Webhook Subscriptions
//!
//! A subscription names the event types an integration system wants, the
//! callback URL and the signing secret. Delivery bookkeeping lives on the
//! subscription itself:
//!
//! ```text
//! success                    → consecutive_failures = 0, last_success_at = now
//! exhausted delivery cycle   → consecutive_failures += 1, last_failure_at = now
//! failures reach threshold   → is_active = false, deactivated_at = now
//! reactivate                 → is_active = true, counter and deactivation cleared
//! ```
//!
//! There is no automatic healing: a deactivated subscription stays
//! inactive until an operator reactivates it.

use csc_core::{SubscriptionId, Timestamp};
use csc_crypto::WebhookSecret;
use csc_registry::{EventType, EventTypeSet};
use serde::Deserialize;
use url::Url;

/// A registered webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookSubscription {
    /// Identifier.
    #[serde(default)]
    pub id: SubscriptionId,
    /// Owning integration system.
    pub integration_system: String,
    /// Event types to deliver.
    pub event_types: EventTypeSet,
    /// Delivery target.
    pub callback_url: Url,
    /// HMAC signing secret.
    pub secret: WebhookSecret,
    /// Inactive subscriptions receive nothing.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Exhausted delivery cycles since the last success.
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Last successful delivery.
    #[serde(default)]
    pub last_success_at: Option<Timestamp>,
    /// Last exhausted delivery cycle.
    #[serde(default)]
    pub last_failure_at: Option<Timestamp>,
    /// When the subscription was deactivated.
    #[serde(default)]
    pub deactivated_at: Option<Timestamp>,
}

fn default_active() -> bool {
    true
}

/// Bookkeeping result of an exhausted cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecorded {
    /// The updated subscription.
    pub subscription: WebhookSubscription,
    /// True if this failure crossed the unhealthy threshold.
    pub deactivated: bool,
}

impl WebhookSubscription {
    /// A fresh, active subscription.
    pub fn new(
        integration_system: impl Into<String>,
        event_types: EventTypeSet,
        callback_url: Url,
        secret: WebhookSecret,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            integration_system: integration_system.into(),
            event_types,
            callback_url,
            secret,
            is_active: true,
            consecutive_failures: 0,
            last_success_at: None,
            last_failure_at: None,
            deactivated_at: None,
        }
    }

    /// True if the subscription is active and wants `event_type`.
    pub fn wants(&self, event_type: EventType) -> bool {
        self.is_active && self.event_types.contains(event_type)
    }

    /// Record a successful delivery.
    pub fn record_success(mut self, at: Timestamp) -> Self {
        self.consecutive_failures = 0;
        self.last_success_at = Some(at);
        self
    }

    /// Record an exhausted delivery cycle, deactivating at `unhealthy_threshold`.
    pub fn record_failure(mut self, at: Timestamp, unhealthy_threshold: u32) -> FailureRecorded {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_at = Some(at);
        let deactivated = self.is_active && self.consecutive_failures >= unhealthy_threshold;
        if deactivated {
            self.is_active = false;
            self.deactivated_at = Some(at);
        }
        FailureRecorded {
            subscription: self,
            deactivated,
        }
    }

    /// Manually reactivate, clearing the failure counter.
    pub fn reactivate(mut self) -> Self {
        self.is_active = true;
        self.consecutive_failures = 0;
        self.deactivated_at = None;
        self
    }

    /// Manually deactivate.
    pub fn deactivate(mut self, at: Timestamp) -> Self {
        if self.is_active {
            self.is_active = false;
            self.deactivated_at = Some(at);
        }
        self
    }

    /// Replace the signing secret. Length is enforced by [`WebhookSecret::new`].
    pub fn rotate_secret(mut self, secret: WebhookSecret) -> Self {
        self.secret = secret;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription() -> WebhookSubscription {
        WebhookSubscription::new(
            "erp-sap",
            EventTypeSet::empty()
                .with(EventType::TransactionBlocked)
                .with(EventType::OverrideRequested),
            Url::parse("https://erp.example.com/hooks/csc").unwrap(),
            WebhookSecret::new("whsec_0123456789abcdef0123456789abcdef").unwrap(),
        )
    }

    #[test]
    fn wants_only_subscribed_types_while_active() {
        let sub = subscription();
        assert!(sub.wants(EventType::TransactionBlocked));
        assert!(!sub.wants(EventType::TransactionPassed));
        let sub = sub.deactivate(Timestamp::now());
        assert!(!sub.wants(EventType::TransactionBlocked));
    }

    #[test]
    fn third_failure_deactivates_once() {
        let mut sub = subscription();
        for expected in [false, false, true] {
            let recorded = sub.record_failure(Timestamp::now(), 3);
            assert_eq!(recorded.deactivated, expected);
            sub = recorded.subscription;
        }
        assert!(!sub.is_active);
        assert!(sub.deactivated_at.is_some());
        let recorded = sub.record_failure(Timestamp::now(), 3);
        assert!(!recorded.deactivated, "already inactive");
        assert_eq!(recorded.subscription.consecutive_failures, 4);
    }

    #[test]
    fn success_and_reactivation_reset_counter() {
        let sub = subscription().record_failure(Timestamp::now(), 3).subscription;
        assert_eq!(sub.consecutive_failures, 1);
        let sub = sub.record_success(Timestamp::now());
        assert_eq!(sub.consecutive_failures, 0);
        assert!(sub.last_success_at.is_some());

        let mut sub = sub;
        for _ in 0..3 {
            sub = sub.record_failure(Timestamp::now(), 3).subscription;
        }
        let sub = sub.reactivate();
        assert!(sub.is_active);
        assert_eq!(sub.consecutive_failures, 0);
        assert!(sub.deactivated_at.is_none());
    }

    #[test]
    fn deserializes_with_defaults() {
        let sub: WebhookSubscription = serde_json::from_value(serde_json::json!({
            "integration_system": "wms",
            "event_types": ["transaction.passed", "licence.revoked"],
            "callback_url": "https://wms.example.com/csc",
            "secret": "whsec_0123456789abcdef0123456789abcdef",
        }))
        .unwrap();
        assert!(sub.is_active);
        assert!(sub.wants(EventType::LicenceRevoked));
        assert_eq!(format!("{:?}", sub.secret), "WebhookSecret([REDACTED])");
    }
}
