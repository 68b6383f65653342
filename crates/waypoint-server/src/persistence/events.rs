//! Processed billing event persistence.

use anyhow::Result;
use sqlx::{Sqlite, SqlitePool};

pub async fn is_processed(pool: &SqlitePool, event_id: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM processed_events WHERE event_id = ?1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Record an event id. Recording an id twice is not an error.
pub async fn mark_processed(pool: &SqlitePool, event_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO processed_events (event_id) VALUES (?1)")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record an event id within a transaction. Returns false if it was already present.
pub async fn insert_processed_tx(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    event_id: &str,
) -> Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO processed_events (event_id) VALUES (?1)")
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete processed event records older than `max_age_days`.
pub async fn prune_processed(pool: &SqlitePool, max_age_days: i64) -> Result<u64> {
    if max_age_days <= 0 {
        return Ok(0);
    }

    let modifier = format!("-{} days", max_age_days);
    let result = sqlx::query(
        "DELETE FROM processed_events WHERE datetime(processed_at) < datetime('now', ?1)",
    )
    .bind(modifier)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    #[tokio::test]
    async fn marking_is_idempotent() {
        let db = init_database(":memory:", 1).await.unwrap();
        let pool = db.pool();

        assert!(!is_processed(pool, "evt_1").await.unwrap());
        mark_processed(pool, "evt_1").await.unwrap();
        mark_processed(pool, "evt_1").await.unwrap();
        assert!(is_processed(pool, "evt_1").await.unwrap());

        let mut tx = pool.begin().await.unwrap();
        assert!(!insert_processed_tx(&mut tx, "evt_1").await.unwrap());
        assert!(insert_processed_tx(&mut tx, "evt_2").await.unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn prune_keeps_recent_events() {
        let db = init_database(":memory:", 1).await.unwrap();
        let pool = db.pool();

        mark_processed(pool, "evt_recent").await.unwrap();
        sqlx::query(
            "INSERT INTO processed_events (event_id, processed_at) \
             VALUES ('evt_old', '2000-01-01 00:00:00')",
        )
            .execute(pool)
            .await
            .unwrap();

        assert_eq!(prune_processed(pool, 90).await.unwrap(), 1);
        assert!(is_processed(pool, "evt_recent").await.unwrap());
        assert!(!is_processed(pool, "evt_old").await.unwrap());
    }
}
