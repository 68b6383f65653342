//! Collaborator interfaces the reconciler depends on.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{BillingNotification, SubscriptionStatus, SubscriptionUpdate, UserBillingState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    NotFound(String),
    /// Conditional update lost against a concurrent write
    #[error("status of user {user_id} is no longer {expected}")]
    Conflict {
        user_id: String,
        expected: SubscriptionStatus,
    },
    /// Event id was recorded by another delivery
    #[error("event {0} already processed")]
    Duplicate(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("notification queue is full")]
    QueueFull,
    #[error("notification channel closed")]
    Closed,
    #[error("notification timed out")]
    Timeout,
    #[error("notification failed: {0}")]
    Failed(String),
}

/// User record store holding billing state and processed event ids.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Fetch a user's billing state, `None` if the user does not exist.
    async fn get_user(&self, user_id: &str) -> Result<Option<UserBillingState>, StoreError>;

    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError>;

    /// Record an event as processed without touching user state.
    async fn mark_event_processed(&self, event_id: &str) -> Result<(), StoreError>;

    /// Atomically compare-and-set the user's state and record the event.
    ///
    /// Fails with [`StoreError::Conflict`] when the current status differs
    /// from `update.expected_status`, and [`StoreError::Duplicate`] when the
    /// event id is already recorded. Nothing is written on failure.
    async fn update_subscription(&self, update: SubscriptionUpdate) -> Result<(), StoreError>;
}

/// Sends user-facing billing notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_billing_notification(
        &self,
        notification: BillingNotification,
    ) -> Result<(), NotificationError>;
}
