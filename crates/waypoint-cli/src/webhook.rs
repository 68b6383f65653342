//! Provider-shaped webhook payloads and a signing HTTP client.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use waypoint_core::provider::provider_event_type;
use waypoint_core::signature::{sign_payload, SIGNATURE_HEADER};
use waypoint_core::EventKind;

/// Fields needed to build a webhook payload.
#[derive(Debug, Clone)]
pub struct EventParams {
    pub kind: EventKind,
    pub event_id: String,
    pub user_id: String,
    pub plan_id: String,
    pub amount_cents: i64,
    /// Unix seconds
    pub created: i64,
}

/// Build a payload shaped like the billing provider's event envelope.
pub fn build_event_payload(params: &EventParams) -> Value {
    let metadata = json!({ "user_id": params.user_id, "plan_id": params.plan_id });

    let status = if params.kind == EventKind::SubscriptionCancelled {
        "canceled"
    } else {
        "active"
    };

    let object = match params.kind {
        EventKind::CheckoutCompleted => json!({
            "object": "checkout.session",
            "mode": "subscription",
            "client_reference_id": params.user_id,
            "amount_total": params.amount_cents,
            "metadata": metadata,
        }),
        EventKind::SubscriptionUpdated | EventKind::SubscriptionCancelled => json!({
            "object": "subscription",
            "status": status,
            "items": { "data": [ { "price": {
                "id": params.plan_id,
                "unit_amount": params.amount_cents,
            } } ] },
            "metadata": metadata,
        }),
        EventKind::PaymentFailed => json!({
            "object": "invoice",
            "amount_due": params.amount_cents,
            "subscription_details": { "metadata": metadata },
        }),
    };

    json!({
        "id": params.event_id,
        "object": "event",
        "type": provider_event_type(params.kind),
        "created": params.created,
        "data": { "object": object },
    })
}

/// Sends signed webhook payloads to a Waypoint server.
pub struct WebhookClient {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
            secret,
        })
    }

    /// POST the payload, signing it when a secret is set.
    /// Returns the response status and body.
    pub fn send(&self, payload: &Value, timestamp: i64) -> Result<(u16, String)> {
        let body = serde_json::to_vec(payload)?;

        let mut request = self
            .client
            .post(&self.url)
            .header("content-type", "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body, timestamp));
        }

        let response = request
            .body(body)
            .send()
            .with_context(|| format!("failed to POST {}", self.url))?;
        let status = response.status().as_u16();
        let text = response.text().unwrap_or_default();
        Ok((status, text))
    }
}
