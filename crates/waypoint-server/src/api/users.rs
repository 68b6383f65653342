//! User registration and billing state lookup.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use waypoint_core::UserBillingState;

use super::error::{ApiError, ApiResult};
use crate::persistence::users::{self, UserRecord};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn validate(req: &UpsertUserRequest) -> ApiResult<()> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::Validation("user_id is required".to_string()));
    }
    let email = req.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::Validation(format!("invalid email address: {}", email))),
    }
}

/// Create a user, or refresh the contact details of an existing one.
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpsertUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserRecord>)> {
    let Json(req) = payload?;
    validate(&req)?;

    let record = users::upsert_user(
        state.db().pool(),
        req.user_id.trim(),
        req.email.trim(),
        req.display_name.as_deref(),
    )
    .await?;

    tracing::info!(user_id = %record.user_id, "user upserted");
    Ok((StatusCode::OK, Json(record)))
}

pub async fn get_billing(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserBillingState>> {
    users::get_user(state.db().pool(), &user_id)
        .await?
        .map(|record| Json(record.billing))
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: &str, email: &str) -> UpsertUserRequest {
        UpsertUserRequest {
            user_id: user_id.to_string(),
            email: email.to_string(),
            display_name: None,
        }
    }

    #[test]
    fn rejects_blank_user_id_and_bad_email() {
        assert!(validate(&request("u1", "ann@example.com")).is_ok());
        assert!(matches!(validate(&request(" ", "ann@example.com")), Err(ApiError::Validation(_))));
        assert!(matches!(validate(&request("u1", "ann")), Err(ApiError::Validation(_))));
        assert!(matches!(validate(&request("u1", "@example.com")), Err(ApiError::Validation(_))));
    }
}
