//! Subscription persistence.

use async_trait::async_trait;
use csc_core::SubscriptionId;
use csc_registry::{EventType, RepositoryError};
use dashmap::DashMap;

use crate::subscription::WebhookSubscription;

/// Load and save webhook subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Active subscriptions listening for `event_type`.
    async fn active_for(&self, event_type: EventType) -> Result<Vec<WebhookSubscription>, RepositoryError>;

    /// Load one subscription.
    async fn get(&self, id: &SubscriptionId) -> Result<Option<WebhookSubscription>, RepositoryError>;

    /// Insert or replace a subscription.
    async fn save(&self, subscription: WebhookSubscription) -> Result<(), RepositoryError>;
}

/// `DashMap`-backed subscription store.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: DashMap<SubscriptionId, WebhookSubscription>,
}

impl InMemorySubscriptionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous insert for setup code.
    pub fn insert(&self, subscription: WebhookSubscription) {
        self.subscriptions.insert(subscription.id, subscription);
    }

    /// Synchronous read.
    pub fn snapshot(&self, id: &SubscriptionId) -> Option<WebhookSubscription> {
        self.subscriptions.get(id).map(|s| s.value().clone())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionStore {
    async fn active_for(&self, event_type: EventType) -> Result<Vec<WebhookSubscription>, RepositoryError> {
        let mut matching: Vec<_> = self
            .subscriptions
            .iter()
            .filter(|entry| entry.value().wants(event_type))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by_key(|s| s.id);
        Ok(matching)
    }

    async fn get(&self, id: &SubscriptionId) -> Result<Option<WebhookSubscription>, RepositoryError> {
        Ok(self.snapshot(id))
    }

    async fn save(&self, subscription: WebhookSubscription) -> Result<(), RepositoryError> {
        self.insert(subscription);
        Ok(())
    }
}
