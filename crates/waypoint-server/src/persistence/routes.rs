//! Saved route persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use waypoint_core::Coordinate;

/// A user-drawn route with its computed length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRoute {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub points: Vec<Coordinate>,
    pub distance_km: f64,
    pub created_at: DateTime<Utc>,
}

/// Insert or replace a saved route.
pub async fn upsert_route(pool: &SqlitePool, route: &SavedRoute) -> Result<()> {
    let points_json = serde_json::to_string(&route.points)?;

    sqlx::query(
        r#"
        INSERT INTO routes (id, user_id, name, points, distance_km, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            name = ?3, points = ?4, distance_km = ?5
        "#,
    )
    .bind(&route.id)
    .bind(&route.user_id)
    .bind(&route.name)
    .bind(&points_json)
    .bind(route.distance_km)
    .bind(route.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_route(pool: &SqlitePool, id: &str) -> Result<Option<SavedRoute>> {
    let row = sqlx::query_as::<_, RouteRow>(
        "SELECT id, user_id, name, points, distance_km, created_at FROM routes WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Load a user's routes, newest first.
pub async fn list_routes_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<SavedRoute>> {
    let rows = sqlx::query_as::<_, RouteRow>(
        r#"
        SELECT id, user_id, name, points, distance_km, created_at
        FROM routes WHERE user_id = ?1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Delete a route by ID.
pub async fn delete_route(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM routes WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct RouteRow {
    id: String,
    user_id: String,
    name: String,
    points: String,
    distance_km: f64,
    created_at: String,
}

impl TryFrom<RouteRow> for SavedRoute {
    type Error = anyhow::Error;

    fn try_from(row: RouteRow) -> Result<Self> {
        // Points were validated on the way in
        let points: Vec<Coordinate> = serde_json::from_str(&row.points)?;

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(SavedRoute {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            points,
            distance_km: row.distance_km,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use chrono::TimeZone;

    fn route(id: &str, user_id: &str, created_at: DateTime<Utc>) -> SavedRoute {
        SavedRoute {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("Loop {id}"),
            points: vec![
                Coordinate::unchecked(45.5017, -73.5673),
                Coordinate::unchecked(45.5025, -73.5680),
            ],
            distance_km: 0.1,
            created_at,
        }
    }

    #[tokio::test]
    async fn routes_are_listed_newest_first_and_deleted() {
        let db = init_database(":memory:", 1).await.unwrap();
        let pool = db.pool();

        let older = route("r1", "u1", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let newer = route("r2", "u1", Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        upsert_route(pool, &older).await.unwrap();
        upsert_route(pool, &newer).await.unwrap();
        upsert_route(pool, &route("r3", "u2", Utc::now())).await.unwrap();

        let listed = list_routes_for_user(pool, "u1").await.unwrap();
        assert_eq!(
            listed.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["r2", "r1"]
        );
        assert_eq!(get_route(pool, "r1").await.unwrap(), Some(older));

        assert!(delete_route(pool, "r1").await.unwrap());
        assert!(!delete_route(pool, "r1").await.unwrap());
        assert_eq!(get_route(pool, "r1").await.unwrap(), None);
    }
}
