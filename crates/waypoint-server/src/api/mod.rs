//! API routes for the Waypoint server.

pub mod auth;
pub mod billing;
pub mod error;
pub mod request_id;
mod routes;
pub mod saved_routes;
pub mod users;

use crate::config::Config;
use axum::Router;

pub fn routes(config: &Config) -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router(config)
}
