use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Discipline {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub professor: Option<String>,
    pub color: Option<String>,
    pub semester: Option<String>,
    pub workload_hours: Option<i32>,
    pub is_favorite: bool,
    pub sort_order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewDiscipline {
    pub name: String,
    pub code: Option<String>,
    pub professor: Option<String>,
    pub color: Option<String>,
    pub semester: Option<String>,
    pub workload_hours: Option<i32>,
    pub is_favorite: bool,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct DisciplineChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub professor: Option<String>,
    pub color: Option<String>,
    pub semester: Option<String>,
    pub workload_hours: Option<i32>,
    pub is_favorite: Option<bool>,
    pub sort_order: Option<i32>,
}

const ORDER_BY: &str = "is_favorite DESC, sort_order ASC NULLS LAST, LOWER(name) ASC, name ASC, id ASC";

impl Discipline {
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Discipline>, DatabaseError> {
        let sql = format!("SELECT * FROM disciplines WHERE user_id = $1 ORDER BY {}", ORDER_BY);
        let rows = sqlx::query_as::<_, Discipline>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn find(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Discipline, DatabaseError> {
        sqlx::query_as::<_, Discipline>("SELECT * FROM disciplines WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Discipline not found".to_string()))
    }

    pub async fn create(pool: &PgPool, user_id: Uuid, new: NewDiscipline) -> Result<Discipline, DatabaseError> {
        let row = sqlx::query_as::<_, Discipline>(
            "INSERT INTO disciplines
                (id, user_id, name, code, professor, color, semester, workload_hours, is_favorite, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM disciplines WHERE user_id = $2))
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.name)
        .bind(new.code)
        .bind(new.professor)
        .bind(new.color)
        .bind(new.semester)
        .bind(new.workload_hours)
        .bind(new.is_favorite)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: DisciplineChanges,
    ) -> Result<Discipline, DatabaseError> {
        sqlx::query_as::<_, Discipline>(
            "UPDATE disciplines SET
                name = COALESCE($3, name),
                code = COALESCE($4, code),
                professor = COALESCE($5, professor),
                color = COALESCE($6, color),
                semester = COALESCE($7, semester),
                workload_hours = COALESCE($8, workload_hours),
                is_favorite = COALESCE($9, is_favorite),
                sort_order = COALESCE($10, sort_order),
                updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.name)
        .bind(changes.code)
        .bind(changes.professor)
        .bind(changes.color)
        .bind(changes.semester)
        .bind(changes.workload_hours)
        .bind(changes.is_favorite)
        .bind(changes.sort_order)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Discipline not found".to_string()))
    }

    /// Set only the sort index. Returns false when the row is not the user's.
    pub async fn set_sort_order(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        sort_order: i32,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE disciplines SET sort_order = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(sort_order)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Persist every row's `sort_order` in one transaction
    pub async fn save_order(pool: &PgPool, user_id: Uuid, ordered: &[Discipline]) -> Result<(), DatabaseError> {
        let mut tx = pool.begin().await?;
        for discipline in ordered {
            sqlx::query("UPDATE disciplines SET sort_order = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2")
                .bind(discipline.id)
                .bind(user_id)
                .bind(discipline.sort_order)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Discipline, DatabaseError> {
        sqlx::query_as::<_, Discipline>("DELETE FROM disciplines WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Discipline not found".to_string()))
    }
}
