//! Queue-backed notifier handed to the reconciler.
//!
//! Enqueuing never waits on delivery; the notification loop drains the queue.

use async_trait::async_trait;
use tokio::sync::mpsc;
use waypoint_core::{BillingNotification, NotificationError, Notifier};

#[derive(Clone)]
pub struct QueuedNotifier {
    sender: mpsc::Sender<BillingNotification>,
}

impl QueuedNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BillingNotification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for QueuedNotifier {
    async fn send_billing_notification(
        &self,
        notification: BillingNotification,
    ) -> Result<(), NotificationError> {
        self.sender.try_send(notification).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => NotificationError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotificationError::Closed,
        })
    }
}
