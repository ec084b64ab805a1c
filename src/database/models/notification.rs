use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::Email => "email",
            Channel::Push => "push",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub channel: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub body: String,
    pub kind: String,
    pub channel: Channel,
}

impl Notification {
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, DatabaseError> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
             ORDER BY created_at DESC
             LIMIT $3",
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn record(pool: &PgPool, user_id: Uuid, new: NewNotification) -> Result<Notification, DatabaseError> {
        let row = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, user_id, title, body, kind, channel)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.title)
        .bind(new.body)
        .bind(new.kind)
        .bind(new.channel.as_str())
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Notification, DatabaseError> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Notification, DatabaseError> {
        sqlx::query_as::<_, Notification>("DELETE FROM notifications WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Notification not found".to_string()))
    }
}
