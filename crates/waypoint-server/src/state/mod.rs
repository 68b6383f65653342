//! Shared application state.

use std::sync::Arc;

use waypoint_core::{Notifier, Reconciler, ReconcilerConfig};

use crate::checkout::CheckoutClient;
use crate::config::Config;
use crate::persistence::{Database, SqliteBillingStore};

/// Clients constructed at startup and shared by all request handlers.
pub struct AppState {
    db: Database,
    config: Config,
    reconciler: Reconciler,
    checkout: Option<CheckoutClient>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: Config,
        notifier: Arc<dyn Notifier>,
        checkout: Option<CheckoutClient>,
    ) -> Self {
        let store = Arc::new(SqliteBillingStore::new(db.clone()));
        let reconciler = Reconciler::new(
            store,
            notifier,
            ReconcilerConfig {
                notify_timeout: config.notify_timeout(),
            },
        );
        Self {
            db,
            config,
            reconciler,
            checkout,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn checkout(&self) -> Option<&CheckoutClient> {
        self.checkout.as_ref()
    }
}
