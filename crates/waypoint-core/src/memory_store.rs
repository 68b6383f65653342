//! In-memory billing store using DashMap.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::{SubscriptionUpdate, UserBillingState};
use crate::store::{BillingStore, StoreError};

/// Thread-safe [`BillingStore`] for tests and single-process embedding.
#[derive(Default)]
pub struct InMemoryBillingStore {
    users: DashMap<String, UserBillingState>,
    processed: DashMap<String, ()>,
    unavailable: AtomicBool,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub fn insert_user(&self, state: UserBillingState) {
        self.users.insert(state.user_id.clone(), state);
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserBillingState>, StoreError> {
        self.check_available()?;
        Ok(self.users.get(user_id).map(|r| r.value().clone()))
    }

    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.processed.contains_key(event_id))
    }

    async fn mark_event_processed(&self, event_id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.processed.insert(event_id.to_string(), ());
        Ok(())
    }

    async fn update_subscription(&self, update: SubscriptionUpdate) -> Result<(), StoreError> {
        self.check_available()?;

        // Lock order: processed entry, then user entry.
        match self.processed.entry(update.event_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(update.event_id)),
            Entry::Vacant(slot) => {
                let user_id = update.state.user_id.clone();
                let mut user = self
                    .users
                    .get_mut(&user_id)
                    .ok_or_else(|| StoreError::NotFound(user_id.clone()))?;
                if user.subscription_status != update.expected_status {
                    return Err(StoreError::Conflict {
                        user_id,
                        expected: update.expected_status,
                    });
                }
                *user = update.state;
                slot.insert(());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionStatus;

    fn active(user_id: &str) -> UserBillingState {
        UserBillingState {
            user_id: user_id.to_string(),
            subscription_status: SubscriptionStatus::Active,
            plan_id: Some("pro".to_string()),
            next_billing_date: None,
        }
    }

    #[tokio::test]
    async fn conditional_update_rejects_stale_status() {
        let store = InMemoryBillingStore::new();
        store.insert_user(active("bob"));

        let err = store
            .update_subscription(SubscriptionUpdate {
                event_id: "evt_1".to_string(),
                expected_status: SubscriptionStatus::None,
                state: active("bob"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(!store.is_event_processed("evt_1").await.unwrap());
    }

    #[tokio::test]
    async fn recorded_event_is_rejected_as_duplicate() {
        let store = InMemoryBillingStore::new();
        store.insert_user(UserBillingState::new("bob"));
        store.mark_event_processed("evt_1").await.unwrap();

        let err = store
            .update_subscription(SubscriptionUpdate {
                event_id: "evt_1".to_string(),
                expected_status: SubscriptionStatus::None,
                state: active("bob"),
            })
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::Duplicate("evt_1".to_string()));
        assert_eq!(
            store.get_user("bob").await.unwrap().unwrap().subscription_status,
            SubscriptionStatus::None
        );
    }
}
