//! Core billing data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of billing event after normalization of the provider payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CheckoutCompleted,
    SubscriptionUpdated,
    SubscriptionCancelled,
    /// Renewal charge failed
    PaymentFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CheckoutCompleted => "checkout_completed",
            EventKind::SubscriptionUpdated => "subscription_updated",
            EventKind::SubscriptionCancelled => "subscription_cancelled",
            EventKind::PaymentFailed => "payment_failed",
        }
    }
}

/// A billing provider event, validated and ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub kind: EventKind,
    pub user_id: String,
    pub plan_id: String,
    pub amount_cents: i64,
    pub occurred_at: DateTime<Utc>,
    /// Provider-assigned event id, used as the idempotency key
    pub provider_event_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Active,
    Cancelled,
    PastDue,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::PastDue => "past_due",
        }
    }

    /// Parse the stored representation. Unknown values map to `None`.
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => SubscriptionStatus::Active,
            "cancelled" => SubscriptionStatus::Cancelled,
            "past_due" => SubscriptionStatus::PastDue,
            _ => SubscriptionStatus::None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing fields of a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBillingState {
    pub user_id: String,
    pub subscription_status: SubscriptionStatus,
    pub plan_id: Option<String>,
    pub next_billing_date: Option<NaiveDate>,
}

impl UserBillingState {
    /// A user who has never subscribed.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            subscription_status: SubscriptionStatus::None,
            plan_id: None,
            next_billing_date: None,
        }
    }
}

/// Details handed to the notification collaborator after a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingNotification {
    pub user_id: String,
    pub kind: EventKind,
    pub plan_id: Option<String>,
    pub amount_cents: i64,
    pub status: SubscriptionStatus,
    pub next_billing_date: Option<NaiveDate>,
}

/// A state write requested by the reconciler.
///
/// The store applies `state` only if the user's current status still equals
/// `expected_status`, and records `event_id` as processed in the same unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub event_id: String,
    pub expected_status: SubscriptionStatus,
    pub state: UserBillingState,
}
