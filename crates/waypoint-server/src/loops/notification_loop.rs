//! Billing notification delivery loop.
//!
//! Drains the queue fed by `QueuedNotifier`, resolves the recipient and sends
//! through the configured mailer. Delivery failures are logged and dropped
//! after the configured number of attempts; they never touch billing state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use waypoint_core::BillingNotification;

use crate::backoff::Backoff;
use crate::config::Config;
use crate::mailer::{render_billing_email, Mailer};
use crate::persistence::{users, Database};

const RETRY_BACKOFF_MAX_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub from: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_base: Duration,
}

impl DeliverySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            from: config.mail_from.clone(),
            timeout: config.notify_timeout(),
            max_attempts: config.notify_max_attempts.max(1),
            retry_base: Duration::from_millis(config.notify_retry_base_ms),
        }
    }
}

/// Run until shutdown or until every sender is gone.
///
/// Returns how many notifications were abandoned at shutdown, counting one
/// interrupted mid-delivery and any still queued.
pub async fn run_notification_loop(
    db: Database,
    mailer: Arc<dyn Mailer>,
    settings: DeliverySettings,
    mut rx: mpsc::Receiver<BillingNotification>,
    mut shutdown: broadcast::Receiver<()>,
) -> usize {
    let mut abandoned = 0;
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Notification loop shutting down");
                break;
            }
            maybe_notification = rx.recv() => {
                let Some(notification) = maybe_notification else {
                    tracing::info!("Notification channel closed");
                    return 0;
                };
                // Retries can sleep for a long time; do not hold up shutdown.
                tokio::select! {
                    result = deliver(&db, mailer.as_ref(), &settings, &notification) => {
                        if let Err(err) = result {
                            tracing::warn!(
                                user_id = %notification.user_id,
                                kind = notification.kind.as_str(),
                                error = %err,
                                "billing notification dropped"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!(
                            user_id = %notification.user_id,
                            "Notification loop shutting down mid-delivery"
                        );
                        abandoned += 1;
                        break;
                    }
                }
            }
        }
    }

    rx.close();
    while rx.try_recv().is_ok() {
        abandoned += 1;
    }
    if abandoned > 0 {
        tracing::warn!(abandoned, "billing notifications not delivered before shutdown");
    }
    abandoned
}

/// Resolve the recipient and send one notification, retrying per `settings`.
pub async fn deliver(
    db: &Database,
    mailer: &dyn Mailer,
    settings: &DeliverySettings,
    notification: &BillingNotification,
) -> Result<()> {
    let user = users::get_user(db.pool(), &notification.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} not found", notification.user_id))?;

    let message = render_billing_email(
        &settings.from,
        &user.email,
        user.display_name.as_deref(),
        notification,
    );

    let mut backoff = Backoff::new(
        settings.retry_base,
        Duration::from_secs(RETRY_BACKOFF_MAX_SECS),
    );
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(settings.timeout, mailer.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("send timed out after {:?}", settings.timeout)),
        };

        match result {
            Ok(()) => {
                tracing::debug!(user_id = %user.user_id, attempt, "billing notification sent");
                return Ok(());
            }
            Err(err) if attempt >= settings.max_attempts => return Err(err),
            Err(err) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    user_id = %user.user_id,
                    attempt,
                    error = %err,
                    "notification send failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
