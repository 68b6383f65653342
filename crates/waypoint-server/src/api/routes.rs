//! REST API routes.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::auth::{self, AdminToken};
use crate::api::{billing, saved_routes, users};
use crate::config::Config;
use crate::state::AppState;

/// Provider webhook payloads are small; reject anything larger outright.
const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

/// Create the API router.
pub fn create_router(config: &Config) -> Router<Arc<AppState>> {
    let admin_token = AdminToken(Arc::new(config.admin_token.clone()));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/v1/routes/distance", post(saved_routes::compute_distance))
        .route("/v1/routes", post(saved_routes::create_route))
        .route("/v1/routes/:route_id", get(saved_routes::get_route))
        .route("/v1/users/:user_id/routes", get(saved_routes::list_user_routes))
        .route("/v1/users/:user_id/billing", get(users::get_billing));

    // Authenticated by the provider signature, not the admin token
    let webhook_routes = Router::new()
        .route("/v1/billing/webhook", post(billing::receive_webhook))
        .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT));

    // Admin routes (require admin token)
    let admin_routes = Router::new()
        .route("/v1/users", post(users::upsert_user))
        .route("/v1/billing/checkout", post(billing::create_checkout))
        .route("/v1/routes/:route_id", axum::routing::delete(saved_routes::delete_route))
        .layer(middleware::from_fn_with_state(admin_token, auth::require_admin));

    public_routes.merge(webhook_routes).merge(admin_routes)
}
