//! # Notification Dispatcher
//!
//! Fans one [`ComplianceEvent`] out to every active subscription whose
//! event set contains its type. Deliveries run concurrently, bounded by
//! [`DispatcherConfig::max_concurrency`], and `dispatch` returns once every
//! subscriber has either succeeded, exhausted its retries, or been
//! cancelled by shutdown.
//!
//! ## Delivery Cycle
//!
//! ```text
//! attempt ──ok──► Delivered         → record_success
//!    │
//!   err ──► wait delay[i] ──► attempt …   (one retry per configured delay)
//!    │            │
//!    │        shutdown ──► Cancelled     (failure counter untouched)
//!    ▼
//! Exhausted → record_failure → threshold reached? → deactivate + one alert
//! ```
//!
//! Subscriber failures never surface as errors from [`NotificationDispatcher::dispatch`];
//! they are reported per subscriber in the [`DispatchReport`]. Only the
//! dispatcher's own inputs (payload serialization, the subscription store
//! lookup) can fail the call.

use std::sync::Arc;

use csc_core::{EventId, SubscriptionId, Timestamp};
use csc_registry::{ComplianceEvent, EventType};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;

use crate::alert::{AlertSink, OperatorAlert};
use crate::config::DispatcherConfig;
use crate::error::NotifyError;
use crate::payload::{PreparedEvent, WebhookRequest};
use crate::store::SubscriptionRepository;
use crate::transport::WebhookTransport;

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Cooperative shutdown signal observed during retry delays.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    rx: Option<watch::Receiver<bool>>,
}

/// The sending half of a [`ShutdownSignal`].
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signal shutdown to every clone of the paired signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// A connected trigger and signal.
    pub fn channel() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Self { rx: Some(rx) })
    }

    /// True once shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve when shutdown is triggered. Pends forever if the trigger is
    /// dropped without firing.
    pub async fn wait(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How one subscriber's delivery cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// A 2xx response was received.
    Delivered {
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// True if this cycle tripped the circuit breaker.
        deactivated: bool,
    },
    /// Shutdown interrupted a retry delay.
    Cancelled {
        /// Attempts made before cancellation.
        attempts: u32,
    },
}

impl DeliveryOutcome {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Exhausted { .. } => "exhausted",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Result for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscriber.
    pub subscription_id: SubscriptionId,
    /// Cycle outcome.
    pub outcome: DeliveryOutcome,
    /// Set if updating the subscription afterwards failed.
    pub bookkeeping_error: Option<String>,
}

/// Aggregate result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Dispatched event.
    pub event_id: EventId,
    /// Its type.
    pub event_type: EventType,
    /// One entry per targeted subscriber, in completion order.
    pub deliveries: Vec<DeliveryReport>,
}

impl DispatchReport {
    /// Number of successful deliveries.
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Delivered { .. }))
    }

    /// Number of exhausted cycles.
    pub fn exhausted(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Exhausted { .. }))
    }

    /// Number of cancelled cycles.
    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Cancelled { .. }))
    }

    /// Number of subscriptions deactivated by this dispatch.
    pub fn deactivated(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Exhausted { deactivated: true, .. }))
    }

    /// Report for a given subscriber.
    pub fn for_subscription(&self, id: &SubscriptionId) -> Option<&DeliveryReport> {
        self.deliveries.iter().find(|d| d.subscription_id == *id)
    }

    fn count(&self, pred: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.deliveries.iter().filter(|d| pred(&d.outcome)).count()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Delivers compliance events to webhook subscribers.
pub struct NotificationDispatcher {
    subscriptions: Arc<dyn SubscriptionRepository>,
    transport: Arc<dyn WebhookTransport>,
    alerts: Arc<dyn AlertSink>,
    config: DispatcherConfig,
    shutdown: ShutdownSignal,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.config)
            .field("shutdown", &self.shutdown.is_triggered())
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher that never observes shutdown.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        transport: Arc<dyn WebhookTransport>,
        alerts: Arc<dyn AlertSink>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            subscriptions,
            transport,
            alerts,
            config,
            shutdown: ShutdownSignal::never(),
        }
    }

    /// Observe `shutdown` during retry delays.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Deliver `event` to every matching active subscription.
    ///
    /// # Errors
    ///
    /// Fails only if the subscription lookup fails or the payload cannot
    /// be built or signed. Nothing is sent in that case. Per-subscriber
    /// delivery failures are in the returned report.
    pub async fn dispatch(&self, event: &ComplianceEvent) -> Result<DispatchReport, NotifyError> {
        let event_type = event.event_type();
        let targets = self.subscriptions.active_for(event_type).await?;
        if targets.is_empty() {
            tracing::debug!(event = %event.event_id, %event_type, "no subscribers for event");
            return Ok(DispatchReport {
                event_id: event.event_id,
                event_type,
                deliveries: Vec::new(),
            });
        }

        let prepared = PreparedEvent::new(event)?;
        tracing::debug!(
            event = %event.event_id,
            %event_type,
            subscribers = targets.len(),
            "dispatching event"
        );

        let requests = targets
            .into_iter()
            .map(|subscription| {
                let request = prepared.request_for(&subscription)?;
                Ok((subscription.id, request))
            })
            .collect::<Result<Vec<_>, NotifyError>>()?;

        let deliveries = stream::iter(requests)
            .map(|(subscription_id, request)| self.deliver(subscription_id, request))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let report = DispatchReport {
            event_id: event.event_id,
            event_type,
            deliveries,
        };
        tracing::info!(
            event = %report.event_id,
            %event_type,
            delivered = report.delivered(),
            exhausted = report.exhausted(),
            cancelled = report.cancelled(),
            deactivated = report.deactivated(),
            "event dispatched"
        );
        Ok(report)
    }

    async fn deliver(&self, subscription_id: SubscriptionId, request: WebhookRequest) -> DeliveryReport {
        let outcome = self.attempt_cycle(subscription_id, &request).await;
        let report = match self.record(subscription_id, outcome).await {
            Ok(outcome) => DeliveryReport {
                subscription_id,
                outcome,
                bookkeeping_error: None,
            },
            Err(err) => {
                tracing::error!(
                    subscription = %subscription_id,
                    error = %err,
                    "failed to record delivery outcome"
                );
                DeliveryReport {
                    subscription_id,
                    outcome,
                    bookkeeping_error: Some(err.to_string()),
                }
            }
        };
        metrics::counter!("csc_webhook_deliveries_total", "outcome" => report.outcome.as_str())
            .increment(1);
        report
    }

    async fn attempt_cycle(&self, subscription_id: SubscriptionId, request: &WebhookRequest) -> DeliveryOutcome {
        let mut delays = self.config.retry_delays.iter();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            metrics::counter!("csc_webhook_attempts_total").increment(1);
            let err = match self.transport.deliver(request).await {
                Ok(()) => return DeliveryOutcome::Delivered { attempts },
                Err(err) => err,
            };

            let Some(delay) = delays.next() else {
                tracing::warn!(
                    subscription = %subscription_id,
                    target = %request.url,
                    attempts,
                    error = %err,
                    "webhook delivery exhausted retries"
                );
                return DeliveryOutcome::Exhausted {
                    attempts,
                    deactivated: false,
                };
            };
            tracing::warn!(
                subscription = %subscription_id,
                target = %request.url,
                attempt = attempts,
                retry_in_secs = delay.as_secs(),
                error = %err,
                "webhook delivery failed, will retry"
            );

            tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    tracing::info!(subscription = %subscription_id, attempts, "webhook retries cancelled by shutdown");
                    return DeliveryOutcome::Cancelled { attempts };
                }
                _ = tokio::time::sleep(*delay) => {}
            }
        }
    }

    /// Apply the cycle outcome to the stored subscription.
    async fn record(
        &self,
        subscription_id: SubscriptionId,
        outcome: DeliveryOutcome,
    ) -> Result<DeliveryOutcome, NotifyError> {
        if let DeliveryOutcome::Cancelled { .. } = outcome {
            return Ok(outcome);
        }
        let Some(current) = self.subscriptions.get(&subscription_id).await? else {
            tracing::warn!(subscription = %subscription_id, "subscription removed during delivery");
            return Ok(outcome);
        };
        let now = Timestamp::now();

        match outcome {
            DeliveryOutcome::Delivered { .. } => {
                self.subscriptions.save(current.record_success(now)).await?;
                Ok(outcome)
            }
            DeliveryOutcome::Exhausted { attempts, .. } => {
                let recorded = current.record_failure(now, self.config.unhealthy_threshold);
                let alert = recorded
                    .deactivated
                    .then(|| OperatorAlert::deactivated(&recorded.subscription, now));
                let deactivated = recorded.deactivated;
                self.subscriptions.save(recorded.subscription).await?;

                if let Some(alert) = alert {
                    metrics::counter!("csc_webhook_deactivations_total").increment(1);
                    tracing::error!(
                        subscription = %alert.subscription_id,
                        integration_system = %alert.integration_system,
                        target = %alert.callback_url,
                        consecutive_failures = alert.consecutive_failures,
                        "webhook subscription deactivated"
                    );
                    self.alerts.raise(alert).await?;
                }
                Ok(DeliveryOutcome::Exhausted {
                    attempts,
                    deactivated,
                })
            }
            DeliveryOutcome::Cancelled { .. } => Ok(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use csc_core::LicenceId;
    use csc_crypto::{verify_signature, WebhookSecret};
    use csc_registry::{EventPayload, EventTypeSet, HolderRef, LicenceChange, LicenceStatus};
    use parking_lot::Mutex;
    use tokio::time::Instant;
    use url::Url;

    use crate::alert::RecordingAlertSink;
    use crate::error::TransportError;
    use crate::payload::SIGNATURE_HEADER;
    use crate::store::InMemorySubscriptionStore;
    use crate::subscription::WebhookSubscription;

    const SECRET: &str = "whsec_0123456789abcdef0123456789abcdef";

    /// Plays back scripted results, then repeats `fallback`.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<(), TransportError>>>,
        fallback: Result<(), TransportError>,
        seen: Mutex<Vec<(WebhookRequest, Instant)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<(), TransportError>>, fallback: Result<(), TransportError>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn always_failing() -> Self {
            Self::new(Vec::new(), Err(TransportError::Status { status: 503 }))
        }

        fn calls(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn deliver(&self, request: &WebhookRequest) -> Result<(), TransportError> {
            self.seen.lock().push((request.clone(), Instant::now()));
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn revoked_event() -> ComplianceEvent {
        ComplianceEvent::new(
            EventPayload::LicenceRevoked(LicenceChange {
                licence_id: LicenceId::new("OW-7").unwrap(),
                holder: HolderRef::Company,
                previous_status: LicenceStatus::Valid,
                new_status: LicenceStatus::Revoked,
                expiry_date: None,
                reason: None,
            }),
            Timestamp::now(),
        )
    }

    fn subscription(url: &str, types: &[EventType]) -> WebhookSubscription {
        WebhookSubscription::new(
            "erp",
            types.iter().copied().collect::<EventTypeSet>(),
            Url::parse(url).unwrap(),
            WebhookSecret::new(SECRET).unwrap(),
        )
    }

    struct Harness {
        store: Arc<InMemorySubscriptionStore>,
        transport: Arc<ScriptedTransport>,
        alerts: Arc<RecordingAlertSink>,
        dispatcher: NotificationDispatcher,
    }

    fn harness(transport: ScriptedTransport) -> Harness {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let transport = Arc::new(transport);
        let alerts = Arc::new(RecordingAlertSink::new());
        let dispatcher = NotificationDispatcher::new(
            store.clone(),
            transport.clone(),
            alerts.clone(),
            DispatcherConfig::default(),
        );
        Harness {
            store,
            transport,
            alerts,
            dispatcher,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_fourth_attempt_resets_counter() {
        let failing = Err(TransportError::Status { status: 500 });
        let h = harness(ScriptedTransport::new(
            vec![failing.clone(), Err(TransportError::Timeout), failing],
            Ok(()),
        ));
        let sub = subscription("https://erp.example.com/hook", &[EventType::LicenceRevoked]);
        let sub = WebhookSubscription {
            consecutive_failures: 2,
            ..sub
        };
        let id = sub.id;
        h.store.insert(sub);

        let report = h.dispatcher.dispatch(&revoked_event()).await.unwrap();
        assert_eq!(report.delivered(), 1);
        assert_eq!(
            report.for_subscription(&id).unwrap().outcome,
            DeliveryOutcome::Delivered { attempts: 4 }
        );

        let seen = h.transport.seen.lock().clone();
        assert_eq!(seen.len(), 4);
        let gaps: Vec<Duration> = seen.windows(2).map(|w| w[1].1 - w[0].1).collect();
        for (gap, expected) in gaps.iter().zip([10u64, 60, 300]) {
            assert!(*gap >= Duration::from_secs(expected), "gap {gap:?} < {expected}s");
            assert!(*gap < Duration::from_secs(expected + 1), "gap {gap:?} > {expected}s");
        }

        let stored = h.store.snapshot(&id).unwrap();
        assert_eq!(stored.consecutive_failures, 0);
        assert!(stored.is_active);
        assert!(stored.last_success_at.is_some());
        assert!(h.alerts.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn third_exhausted_cycle_deactivates_with_one_alert() {
        let h = harness(ScriptedTransport::always_failing());
        let sub = subscription("https://erp.example.com/hook", &[EventType::LicenceRevoked]);
        let id = sub.id;
        h.store.insert(sub);

        for cycle in 1..=3u32 {
            let report = h.dispatcher.dispatch(&revoked_event()).await.unwrap();
            let outcome = report.for_subscription(&id).unwrap().outcome;
            assert_eq!(
                outcome,
                DeliveryOutcome::Exhausted {
                    attempts: 4,
                    deactivated: cycle == 3
                }
            );
            assert_eq!(h.store.snapshot(&id).unwrap().consecutive_failures, cycle);
        }
        assert_eq!(h.transport.calls(), 12);

        let stored = h.store.snapshot(&id).unwrap();
        assert!(!stored.is_active);
        assert!(stored.deactivated_at.is_some());
        let alerts = h.alerts.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].subscription_id, id);
        assert_eq!(alerts[0].integration_system, "erp");

        // Deactivated subscriptions are no longer targeted.
        let report = h.dispatcher.dispatch(&revoked_event()).await.unwrap();
        assert!(report.deliveries.is_empty());
        assert_eq!(h.transport.calls(), 12);
        assert_eq!(h.alerts.alerts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_retries() {
        let h = harness(ScriptedTransport::always_failing());
        let (trigger, signal) = ShutdownSignal::channel();
        let dispatcher = h.dispatcher.with_shutdown(signal);
        let sub = subscription("https://erp.example.com/hook", &[EventType::LicenceRevoked]);
        let id = sub.id;
        h.store.insert(sub);

        let event = revoked_event();
        let (report, ()) = tokio::join!(dispatcher.dispatch(&event), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.trigger();
        });
        let report = report.unwrap();
        assert_eq!(
            report.for_subscription(&id).unwrap().outcome,
            DeliveryOutcome::Cancelled { attempts: 1 }
        );
        assert_eq!(h.transport.calls(), 1);
        let stored = h.store.snapshot(&id).unwrap();
        assert_eq!(stored.consecutive_failures, 0);
        assert!(stored.last_failure_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn only_matching_active_subscriptions_are_targeted() {
        let h = harness(ScriptedTransport::new(Vec::new(), Ok(())));
        let wanted = subscription("https://a.example.com/hook", &[EventType::LicenceRevoked]);
        let other_type = subscription("https://b.example.com/hook", &[EventType::LicenceSuspended]);
        let inactive = subscription("https://c.example.com/hook", &[EventType::LicenceRevoked])
            .deactivate(Timestamp::now());
        let wanted_id = wanted.id;
        h.store.insert(wanted);
        h.store.insert(other_type);
        h.store.insert(inactive);

        let report = h.dispatcher.dispatch(&revoked_event()).await.unwrap();
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(report.deliveries[0].subscription_id, wanted_id);

        let seen = h.transport.seen.lock().clone();
        let (request, _) = &seen[0];
        assert_eq!(request.url.as_str(), "https://a.example.com/hook");
        let secret = WebhookSecret::new(SECRET).unwrap();
        assert!(verify_signature(&secret, &request.body, request.header(SIGNATURE_HEADER).unwrap()).is_ok());
    }

    #[tokio::test]
    async fn shutdown_signal_without_trigger_never_fires() {
        let signal = ShutdownSignal::never();
        assert!(!signal.is_triggered());
        let waited = tokio::time::timeout(Duration::from_millis(10), signal.wait()).await;
        assert!(waited.is_err());

        let (trigger, signal) = ShutdownSignal::channel();
        trigger.trigger();
        assert!(signal.is_triggered());
        signal.wait().await;
    }
}
