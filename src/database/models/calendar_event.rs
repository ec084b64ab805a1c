use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub discipline_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCalendarEvent {
    pub discipline_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarEventChanges {
    pub discipline_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
}

impl CalendarEvent {
    /// Events overlapping `[from, to)`; open bounds are unbounded.
    pub async fn list_between(
        pool: &PgPool,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<CalendarEvent>, DatabaseError> {
        let rows = sqlx::query_as::<_, CalendarEvent>(
            "SELECT * FROM calendar_events
             WHERE user_id = $1
               AND ($2::timestamptz IS NULL OR ends_at >= $2)
               AND ($3::timestamptz IS NULL OR starts_at < $3)
             ORDER BY starts_at ASC",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<CalendarEvent, DatabaseError> {
        sqlx::query_as::<_, CalendarEvent>("SELECT * FROM calendar_events WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Event not found".to_string()))
    }

    pub async fn create(pool: &PgPool, user_id: Uuid, new: NewCalendarEvent) -> Result<CalendarEvent, DatabaseError> {
        let row = sqlx::query_as::<_, CalendarEvent>(
            "INSERT INTO calendar_events
                (id, user_id, discipline_id, title, description, starts_at, ends_at, all_day)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.discipline_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .bind(new.all_day)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: CalendarEventChanges,
    ) -> Result<CalendarEvent, DatabaseError> {
        sqlx::query_as::<_, CalendarEvent>(
            "UPDATE calendar_events SET
                discipline_id = COALESCE($3, discipline_id),
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                starts_at = COALESCE($6, starts_at),
                ends_at = COALESCE($7, ends_at),
                all_day = COALESCE($8, all_day),
                updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.discipline_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.starts_at)
        .bind(changes.ends_at)
        .bind(changes.all_day)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Event not found".to_string()))
    }

    pub async fn set_external_id(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        external_id: &str,
    ) -> Result<CalendarEvent, DatabaseError> {
        sqlx::query_as::<_, CalendarEvent>(
            "UPDATE calendar_events SET external_id = $3, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(external_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Event not found".to_string()))
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<CalendarEvent, DatabaseError> {
        sqlx::query_as::<_, CalendarEvent>("DELETE FROM calendar_events WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Event not found".to_string()))
    }
}
