//! Normalization of raw billing provider (Stripe-shaped) webhook payloads.
//!
//! Anything that is not one of the known event types is rejected here,
//! before reaching the reconciler.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{EventKind, SubscriptionEvent};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("unsupported event type {0}")]
    UnsupportedEventType(String),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(i64),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: Value,
}

/// Map a provider event type string to a known kind.
pub fn event_kind(event_type: &str) -> Option<EventKind> {
    match event_type {
        "checkout.session.completed" => Some(EventKind::CheckoutCompleted),
        "customer.subscription.updated" => Some(EventKind::SubscriptionUpdated),
        "customer.subscription.deleted" => Some(EventKind::SubscriptionCancelled),
        "invoice.payment_failed" => Some(EventKind::PaymentFailed),
        _ => None,
    }
}

/// Provider event type string for a kind; inverse of [`event_kind`].
pub fn provider_event_type(kind: EventKind) -> &'static str {
    match kind {
        EventKind::CheckoutCompleted => "checkout.session.completed",
        EventKind::SubscriptionUpdated => "customer.subscription.updated",
        EventKind::SubscriptionCancelled => "customer.subscription.deleted",
        EventKind::PaymentFailed => "invoice.payment_failed",
    }
}

/// Parse and validate a raw webhook body into a [`SubscriptionEvent`].
pub fn parse_provider_event(payload: &[u8]) -> Result<SubscriptionEvent, PayloadError> {
    let envelope: Envelope =
        serde_json::from_slice(payload).map_err(|e| PayloadError::Malformed(e.to_string()))?;

    let kind = event_kind(&envelope.event_type)
        .ok_or_else(|| PayloadError::UnsupportedEventType(envelope.event_type.clone()))?;

    let occurred_at = DateTime::<Utc>::from_timestamp(envelope.created, 0)
        .ok_or(PayloadError::InvalidTimestamp(envelope.created))?;

    let object = &envelope.data.object;
    let (user_id, plan_id, amount_cents) = match kind {
        EventKind::CheckoutCompleted => (
            str_at(object, &["client_reference_id"])
                .or_else(|| str_at(object, &["metadata", "user_id"])),
            str_at(object, &["metadata", "plan_id"]),
            object.get("amount_total").and_then(Value::as_i64),
        ),
        EventKind::SubscriptionUpdated | EventKind::SubscriptionCancelled => {
            let price = object.pointer("/items/data/0/price");
            (
                str_at(object, &["metadata", "user_id"]),
                price
                    .and_then(|p| p.get("id"))
                    .and_then(Value::as_str)
                    .or_else(|| str_at(object, &["metadata", "plan_id"])),
                price.and_then(|p| p.get("unit_amount")).and_then(Value::as_i64),
            )
        }
        EventKind::PaymentFailed => (
            str_at(object, &["subscription_details", "metadata", "user_id"])
                .or_else(|| str_at(object, &["metadata", "user_id"])),
            str_at(object, &["subscription_details", "metadata", "plan_id"])
                .or_else(|| str_at(object, &["metadata", "plan_id"])),
            object.get("amount_due").and_then(Value::as_i64),
        ),
    };

    let user_id = user_id
        .filter(|s| !s.is_empty())
        .ok_or(PayloadError::MissingField("user_id"))?;
    let plan_id = plan_id
        .filter(|s| !s.is_empty())
        .ok_or(PayloadError::MissingField("plan_id"))?;

    if envelope.id.is_empty() {
        return Err(PayloadError::MissingField("id"));
    }

    Ok(SubscriptionEvent {
        kind,
        user_id: user_id.to_string(),
        plan_id: plan_id.to_string(),
        amount_cents: amount_cents.unwrap_or(0),
        occurred_at,
        provider_event_id: envelope.id,
    })
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn checkout_session_maps_reference_id_and_metadata() {
        let event = parse_provider_event(&body(json!({
            "id": "evt_checkout",
            "type": "checkout.session.completed",
            "created": 1_700_000_000,
            "data": { "object": {
                "client_reference_id": "user-42",
                "amount_total": 999,
                "metadata": { "plan_id": "pro" }
            }}
        })))
        .unwrap();

        assert_eq!(event.kind, EventKind::CheckoutCompleted);
        assert_eq!(event.user_id, "user-42");
        assert_eq!(event.plan_id, "pro");
        assert_eq!(event.amount_cents, 999);
        assert_eq!(event.provider_event_id, "evt_checkout");
        assert_eq!(event.occurred_at, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn subscription_update_reads_price_from_items() {
        let event = parse_provider_event(&body(json!({
            "id": "evt_upd",
            "type": "customer.subscription.updated",
            "created": 1_700_000_100,
            "data": { "object": {
                "metadata": { "user_id": "user-42" },
                "items": { "data": [ { "price": { "id": "price_team", "unit_amount": 2500 } } ] }
            }}
        })))
        .unwrap();

        assert_eq!(event.kind, EventKind::SubscriptionUpdated);
        assert_eq!(event.plan_id, "price_team");
        assert_eq!(event.amount_cents, 2500);
    }

    #[test]
    fn subscription_deleted_falls_back_to_metadata_plan() {
        let event = parse_provider_event(&body(json!({
            "id": "evt_del",
            "type": "customer.subscription.deleted",
            "created": 1_700_000_200,
            "data": { "object": { "metadata": { "user_id": "user-42", "plan_id": "pro" } } }
        })))
        .unwrap();

        assert_eq!(event.kind, EventKind::SubscriptionCancelled);
        assert_eq!(event.plan_id, "pro");
        assert_eq!(event.amount_cents, 0);
    }

    #[test]
    fn invoice_failure_reads_subscription_details() {
        let event = parse_provider_event(&body(json!({
            "id": "evt_inv",
            "type": "invoice.payment_failed",
            "created": 1_700_000_300,
            "data": { "object": {
                "amount_due": 999,
                "subscription_details": { "metadata": { "user_id": "user-42", "plan_id": "pro" } }
            }}
        })))
        .unwrap();

        assert_eq!(event.kind, EventKind::PaymentFailed);
        assert_eq!(event.user_id, "user-42");
        assert_eq!(event.amount_cents, 999);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = parse_provider_event(&body(json!({
            "id": "evt_x",
            "type": "customer.created",
            "created": 1_700_000_000,
            "data": { "object": {} }
        })))
        .unwrap_err();
        assert_eq!(err, PayloadError::UnsupportedEventType("customer.created".to_string()));
    }

    #[test]
    fn missing_user_is_rejected() {
        let err = parse_provider_event(&body(json!({
            "id": "evt_x",
            "type": "checkout.session.completed",
            "created": 1_700_000_000,
            "data": { "object": { "metadata": { "plan_id": "pro" } } }
        })))
        .unwrap_err();
        assert_eq!(err, PayloadError::MissingField("user_id"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_provider_event(b"not json"),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn event_type_names_round_trip() {
        for kind in [
            EventKind::CheckoutCompleted,
            EventKind::SubscriptionUpdated,
            EventKind::SubscriptionCancelled,
            EventKind::PaymentFailed,
        ] {
            assert_eq!(event_kind(provider_event_type(kind)), Some(kind));
        }
    }
}
