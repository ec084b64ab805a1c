use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::domain::gamification::Action;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GamificationEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub points: i32,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl GamificationEvent {
    /// Append to the ledger. `None` when a once-per-day action already has a
    /// row for today (enforced by a partial unique index).
    pub async fn record(
        pool: &PgPool,
        user_id: Uuid,
        action: Action,
        metadata: Value,
    ) -> Result<Option<GamificationEvent>, DatabaseError> {
        let row = sqlx::query_as::<_, GamificationEvent>(
            "INSERT INTO gamification_events (id, user_id, action, points, metadata)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT DO NOTHING
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(action.as_str())
        .bind(action.points())
        .bind(metadata)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn total_points(pool: &PgPool, user_id: Uuid) -> Result<i64, DatabaseError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)::bigint FROM gamification_events WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(total)
    }

    /// Distinct UTC days with any activity, newest first
    pub async fn active_days(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<NaiveDate>, DatabaseError> {
        let days: Vec<NaiveDate> = sqlx::query_scalar(
            "SELECT DISTINCT (created_at AT TIME ZONE 'UTC')::date AS day
             FROM gamification_events
             WHERE user_id = $1
             ORDER BY day DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(days)
    }

    pub async fn recent(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<GamificationEvent>, DatabaseError> {
        let rows = sqlx::query_as::<_, GamificationEvent>(
            "SELECT * FROM gamification_events WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
