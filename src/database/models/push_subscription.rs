use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPushSubscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
}

impl PushSubscription {
    /// One subscription per endpoint per user: re-subscribing refreshes keys
    pub async fn upsert(pool: &PgPool, user_id: Uuid, new: NewPushSubscription) -> Result<PushSubscription, DatabaseError> {
        let row = sqlx::query_as::<_, PushSubscription>(
            "INSERT INTO push_subscriptions (id, user_id, endpoint, p256dh, auth, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, endpoint) DO UPDATE SET
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                user_agent = EXCLUDED.user_agent
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.endpoint)
        .bind(new.p256dh)
        .bind(new.auth)
        .bind(new.user_agent)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<PushSubscription>, DatabaseError> {
        let rows = sqlx::query_as::<_, PushSubscription>(
            "SELECT * FROM push_subscriptions WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_by_endpoint(pool: &PgPool, user_id: Uuid, endpoint: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = $1 AND endpoint = $2")
            .bind(user_id)
            .bind(endpoint)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_ids(pool: &PgPool, user_id: Uuid, ids: &[Uuid]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
