//! Billing endpoints: provider webhook intake and checkout sessions.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use waypoint_core::signature::{verify_signature, SIGNATURE_HEADER};
use waypoint_core::{parse_provider_event, PayloadError, ReconcileOutcome};

use super::error::{ApiError, ApiResult};
use super::request_id::RequestId;
use crate::checkout::CheckoutSession;
use crate::persistence::users;
use crate::state::AppState;

/// Receive a billing provider webhook and reconcile it.
///
/// Unsupported event types are acknowledged with 202 so the provider does not
/// keep redelivering them. Unknown users and store failures return 404/503,
/// which the provider retries.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let config = state.config();
    match &config.stripe_webhook_secret {
        Some(secret) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    ApiError::Validation(format!("missing {} header", SIGNATURE_HEADER))
                })?;
            verify_signature(
                secret,
                &body,
                signature,
                Utc::now().timestamp(),
                config.stripe_webhook_tolerance_secs,
            )?;
        }
        None => {
            tracing::warn!(
                %request_id,
                "STRIPE_WEBHOOK_SECRET not set, skipping signature verification"
            );
        }
    }

    let event = match parse_provider_event(&body) {
        Ok(event) => event,
        Err(PayloadError::UnsupportedEventType(event_type)) => {
            tracing::debug!(%request_id, %event_type, "ignoring unsupported webhook event");
            return Ok((
                StatusCode::ACCEPTED,
                Json(json!({ "status": "ignored", "event_type": event_type })),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let outcome = state.reconciler().reconcile(&event).await?;

    let response = match outcome {
        ReconcileOutcome::Applied { current, .. } => json!({
            "status": "applied",
            "event_id": event.provider_event_id,
            "subscription": current,
        }),
        ReconcileOutcome::Skipped => json!({
            "status": "skipped",
            "event_id": event.provider_event_id,
        }),
        ReconcileOutcome::AlreadyProcessed => json!({
            "status": "duplicate",
            "event_id": event.provider_event_id,
        }),
    };

    Ok((StatusCode::OK, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub plan_id: String,
}

/// Start a hosted checkout session for a known user.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CheckoutSession>)> {
    let Json(req) = payload?;
    if req.plan_id.trim().is_empty() {
        return Err(ApiError::Validation("plan_id is required".to_string()));
    }

    let client = state
        .checkout()
        .ok_or_else(|| ApiError::Unavailable("billing provider is not configured".to_string()))?;

    if users::get_user(state.db().pool(), &req.user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user {} not found", req.user_id)));
    }

    let session = client
        .create_session(&req.user_id, &req.plan_id)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    tracing::info!(
        user_id = %req.user_id,
        plan_id = %req.plan_id,
        session_id = %session.session_id,
        "created checkout session"
    );

    Ok((StatusCode::CREATED, Json(session)))
}
