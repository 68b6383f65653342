//! User persistence operations.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool};
use waypoint_core::{SubscriptionStatus, SubscriptionUpdate, UserBillingState};

/// A user row with contact details and billing state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub billing: UserBillingState,
}

/// Insert a user, or update contact details of an existing one.
///
/// Billing fields are never touched here; new users start with status `none`.
pub async fn upsert_user(
    pool: &SqlitePool,
    user_id: &str,
    email: &str,
    display_name: Option<&str>,
) -> Result<UserRecord> {
    sqlx::query(
        r#"
        INSERT INTO users (user_id, email, display_name)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(user_id) DO UPDATE SET
            email = ?2,
            display_name = COALESCE(?3, display_name),
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(display_name)
    .execute(pool)
    .await?;

    get_user(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} missing after upsert", user_id))
}

/// Load a user by id.
pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, display_name, subscription_status, plan_id, next_billing_date
        FROM users WHERE user_id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// Compare-and-set the billing fields within an existing transaction.
///
/// Returns the number of rows changed; 0 means the user is missing or its
/// status no longer matches `update.expected_status`.
pub async fn update_subscription_tx(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    update: &SubscriptionUpdate,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            subscription_status = ?1,
            plan_id = ?2,
            next_billing_date = ?3,
            updated_at = CURRENT_TIMESTAMP
        WHERE user_id = ?4 AND subscription_status = ?5
        "#,
    )
    .bind(update.state.subscription_status.as_str())
    .bind(&update.state.plan_id)
    .bind(update.state.next_billing_date.map(|d| d.to_string()))
    .bind(&update.state.user_id)
    .bind(update.expected_status.as_str())
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Check whether a user exists within an existing transaction.
pub async fn user_exists_tx(tx: &mut sqlx::Transaction<'_, Sqlite>, user_id: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    email: String,
    display_name: Option<String>,
    subscription_status: String,
    plan_id: Option<String>,
    next_billing_date: Option<String>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        let next_billing_date = row
            .next_billing_date
            .as_deref()
            .and_then(|s| s.parse::<NaiveDate>().ok());

        UserRecord {
            billing: UserBillingState {
                user_id: row.user_id.clone(),
                subscription_status: SubscriptionStatus::parse(&row.subscription_status),
                plan_id: row.plan_id,
                next_billing_date,
            },
            user_id: row.user_id,
            email: row.email,
            display_name: row.display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    #[tokio::test]
    async fn upsert_preserves_billing_state() {
        let db = init_database(":memory:", 1).await.unwrap();
        let pool = db.pool();

        let created = upsert_user(pool, "u1", "a@example.com", Some("Ann")).await.unwrap();
        assert_eq!(created.billing, UserBillingState::new("u1"));

        let mut tx = pool.begin().await.unwrap();
        let changed = update_subscription_tx(
            &mut tx,
            &SubscriptionUpdate {
                event_id: "evt_1".to_string(),
                expected_status: SubscriptionStatus::None,
                state: UserBillingState {
                    user_id: "u1".to_string(),
                    subscription_status: SubscriptionStatus::Active,
                    plan_id: Some("pro".to_string()),
                    next_billing_date: NaiveDate::from_ymd_opt(2024, 5, 1),
                },
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(changed, 1);

        let updated = upsert_user(pool, "u1", "new@example.com", None).await.unwrap();
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.display_name.as_deref(), Some("Ann"));
        assert_eq!(updated.billing.subscription_status, SubscriptionStatus::Active);
        assert_eq!(updated.billing.next_billing_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }
}
