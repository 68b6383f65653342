//! Route distance and saved route endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use waypoint_core::{round_km, route_distance_km, Coordinate};

use super::error::{ApiError, ApiResult};
use crate::persistence::routes::{self, SavedRoute};
use crate::persistence::users;
use crate::state::AppState;

const MAX_ROUTE_NAME_LEN: usize = 120;

#[derive(Debug, Deserialize)]
pub struct DistanceRequest {
    pub points: Vec<Coordinate>,
}

#[derive(Debug, Serialize)]
pub struct DistanceResponse {
    pub distance_km: f64,
    pub display_km: f64,
    pub point_count: usize,
}

/// Compute the length of an unsaved route.
pub async fn compute_distance(
    payload: Result<Json<DistanceRequest>, JsonRejection>,
) -> ApiResult<Json<DistanceResponse>> {
    let Json(req) = payload?;
    let distance_km = route_distance_km(&req.points);
    Ok(Json(DistanceResponse {
        distance_km,
        display_km: round_km(distance_km),
        point_count: req.points.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateRouteRequest {
    pub user_id: String,
    pub name: String,
    pub points: Vec<Coordinate>,
}

pub async fn create_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRouteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SavedRoute>)> {
    let Json(req) = payload?;

    let name = req.name.trim();
    if name.is_empty() || name.len() > MAX_ROUTE_NAME_LEN {
        return Err(ApiError::Validation(format!(
            "name must be 1-{} characters",
            MAX_ROUTE_NAME_LEN
        )));
    }

    let pool = state.db().pool();
    if users::get_user(pool, &req.user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user {} not found", req.user_id)));
    }

    let route = SavedRoute {
        id: Uuid::new_v4().to_string(),
        user_id: req.user_id,
        name: name.to_string(),
        distance_km: route_distance_km(&req.points),
        points: req.points,
        created_at: Utc::now(),
    };
    routes::upsert_route(pool, &route).await?;

    tracing::info!(
        route_id = %route.id,
        user_id = %route.user_id,
        points = route.points.len(),
        distance_km = route.distance_km,
        "route saved"
    );
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<String>,
) -> ApiResult<Json<SavedRoute>> {
    routes::get_route(state.db().pool(), &route_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("route {} not found", route_id)))
}

pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<String>,
) -> ApiResult<StatusCode> {
    if routes::delete_route(state.db().pool(), &route_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("route {} not found", route_id)))
    }
}

#[derive(Debug, Serialize)]
pub struct UserRoutesResponse {
    pub routes: Vec<SavedRoute>,
    pub total_km: f64,
}

pub async fn list_user_routes(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserRoutesResponse>> {
    let pool = state.db().pool();
    if users::get_user(pool, &user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user {} not found", user_id)));
    }

    let routes = routes::list_routes_for_user(pool, &user_id).await?;
    let total_km = round_km(routes.iter().map(|r| r.distance_km).sum());
    Ok(Json(UserRoutesResponse { routes, total_km }))
}
