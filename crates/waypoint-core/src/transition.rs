//! Subscription status state machine.

use chrono::Duration;

use crate::models::{EventKind, SubscriptionEvent, SubscriptionStatus, UserBillingState};

/// Length of one billing period.
pub const BILLING_PERIOD_DAYS: i64 = 30;

/// Result of applying an event to a user's billing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Write the new state.
    Apply(UserBillingState),
    /// Event does not apply to the current status; nothing to write.
    Skip,
}

/// Compute the state that `event` moves `current` into.
pub fn transition(current: &UserBillingState, event: &SubscriptionEvent) -> Transition {
    let next_billing_date =
        Some((event.occurred_at + Duration::days(BILLING_PERIOD_DAYS)).date_naive());

    match (event.kind, current.subscription_status) {
        (EventKind::CheckoutCompleted, _) => Transition::Apply(UserBillingState {
            user_id: current.user_id.clone(),
            subscription_status: SubscriptionStatus::Active,
            plan_id: Some(event.plan_id.clone()),
            next_billing_date,
        }),
        (
            EventKind::SubscriptionUpdated,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue,
        ) => Transition::Apply(UserBillingState {
            user_id: current.user_id.clone(),
            subscription_status: SubscriptionStatus::Active,
            plan_id: Some(event.plan_id.clone()),
            next_billing_date,
        }),
        // Plan is kept so past subscriptions can still be displayed
        (
            EventKind::SubscriptionCancelled,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue,
        ) => Transition::Apply(UserBillingState {
            user_id: current.user_id.clone(),
            subscription_status: SubscriptionStatus::Cancelled,
            plan_id: current.plan_id.clone(),
            next_billing_date: None,
        }),
        (EventKind::PaymentFailed, SubscriptionStatus::Active) => {
            Transition::Apply(UserBillingState {
                subscription_status: SubscriptionStatus::PastDue,
                ..current.clone()
            })
        }
        _ => Transition::Skip,
    }
}
