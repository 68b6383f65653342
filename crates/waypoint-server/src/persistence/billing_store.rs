//! SQLite implementation of the reconciler's [`BillingStore`].

use async_trait::async_trait;
use waypoint_core::{BillingStore, StoreError, SubscriptionUpdate, UserBillingState};

use super::{events, users, Database};

#[derive(Clone)]
pub struct SqliteBillingStore {
    db: Database,
}

impl SqliteBillingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn unavailable(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl BillingStore for SqliteBillingStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserBillingState>, StoreError> {
        users::get_user(self.db.pool(), user_id)
            .await
            .map(|user| user.map(|u| u.billing))
            .map_err(unavailable)
    }

    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        events::is_processed(self.db.pool(), event_id)
            .await
            .map_err(unavailable)
    }

    async fn mark_event_processed(&self, event_id: &str) -> Result<(), StoreError> {
        events::mark_processed(self.db.pool(), event_id)
            .await
            .map_err(unavailable)
    }

    async fn update_subscription(&self, update: SubscriptionUpdate) -> Result<(), StoreError> {
        let mut tx = self.db.pool().begin().await.map_err(unavailable)?;

        if !events::insert_processed_tx(&mut tx, &update.event_id)
            .await
            .map_err(unavailable)?
        {
            tx.rollback().await.map_err(unavailable)?;
            return Err(StoreError::Duplicate(update.event_id));
        }

        let changed = users::update_subscription_tx(&mut tx, &update)
            .await
            .map_err(unavailable)?;

        if changed == 0 {
            let user_id = update.state.user_id;
            let exists = users::user_exists_tx(&mut tx, &user_id)
                .await
                .map_err(unavailable)?;
            tx.rollback().await.map_err(unavailable)?;
            return Err(if exists {
                StoreError::Conflict {
                    user_id,
                    expected: update.expected_status,
                }
            } else {
                StoreError::NotFound(user_id)
            });
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }
}
