//! Subscription reconciliation.
//!
//! Applies a normalized [`SubscriptionEvent`] to the user store at most once
//! per provider event id, then hands a notification to the notifier. A
//! failed or slow notification never undoes the committed state.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{BillingNotification, SubscriptionEvent, SubscriptionUpdate, UserBillingState};
use crate::store::{BillingStore, NotificationError, Notifier, StoreError};
use crate::transition::{transition, Transition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Unknown user; retry once the user record exists
    #[error("user {0} not found")]
    NotFound(String),
    /// Store unavailable or write conflict; safe to retry
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied {
        previous: UserBillingState,
        current: UserBillingState,
    },
    /// Event does not apply to the user's current status
    Skipped,
    AlreadyProcessed,
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Upper bound on how long the reconciler waits for the notifier.
    pub notify_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            notify_timeout: Duration::from_secs(5),
        }
    }
}

pub struct Reconciler {
    store: Arc<dyn BillingStore>,
    notifier: Arc<dyn Notifier>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn BillingStore>,
        notifier: Arc<dyn Notifier>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub async fn reconcile(
        &self,
        event: &SubscriptionEvent,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let event_id = event.provider_event_id.as_str();

        if self
            .store
            .is_event_processed(event_id)
            .await
            .map_err(ReconcileError::Persistence)?
        {
            debug!(event_id, "event already processed");
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let previous = self
            .store
            .get_user(&event.user_id)
            .await
            .map_err(ReconcileError::Persistence)?
            .ok_or_else(|| ReconcileError::NotFound(event.user_id.clone()))?;

        let current = match transition(&previous, event) {
            Transition::Apply(state) => state,
            Transition::Skip => {
                self.store
                    .mark_event_processed(event_id)
                    .await
                    .map_err(ReconcileError::Persistence)?;
                info!(
                    event_id,
                    user_id = %event.user_id,
                    kind = event.kind.as_str(),
                    status = %previous.subscription_status,
                    "event does not apply to current status, skipped"
                );
                return Ok(ReconcileOutcome::Skipped);
            }
        };

        let update = SubscriptionUpdate {
            event_id: event_id.to_string(),
            expected_status: previous.subscription_status,
            state: current.clone(),
        };
        match self.store.update_subscription(update).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                debug!(event_id, "event recorded by a concurrent delivery");
                return Ok(ReconcileOutcome::AlreadyProcessed);
            }
            Err(StoreError::NotFound(user_id)) => return Err(ReconcileError::NotFound(user_id)),
            Err(err) => return Err(ReconcileError::Persistence(err)),
        }

        info!(
            event_id,
            user_id = %event.user_id,
            kind = event.kind.as_str(),
            from = %previous.subscription_status,
            to = %current.subscription_status,
            "subscription reconciled"
        );

        self.notify(event, &current).await;

        Ok(ReconcileOutcome::Applied { previous, current })
    }

    async fn notify(&self, event: &SubscriptionEvent, state: &UserBillingState) {
        let notification = BillingNotification {
            user_id: state.user_id.clone(),
            kind: event.kind,
            plan_id: state.plan_id.clone(),
            amount_cents: event.amount_cents,
            status: state.subscription_status,
            next_billing_date: state.next_billing_date,
        };

        let result = tokio::time::timeout(
            self.config.notify_timeout,
            self.notifier.send_billing_notification(notification),
        )
        .await
        .unwrap_or(Err(NotificationError::Timeout));

        if let Err(err) = result {
            warn!(
                event_id = %event.provider_event_id,
                user_id = %state.user_id,
                error = %err,
                "billing notification not delivered"
            );
        }
    }
}
