use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

pub const EVALUATION_KINDS: &[&str] = &["exam", "assignment", "project", "quiz", "other"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Evaluation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub discipline_id: Uuid,
    pub title: String,
    pub kind: String,
    pub grade: Option<f64>,
    pub max_grade: f64,
    pub weight: f64,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub discipline_id: Uuid,
    pub title: String,
    pub kind: String,
    pub grade: Option<f64>,
    pub max_grade: f64,
    pub weight: f64,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationChanges {
    pub title: Option<String>,
    pub kind: Option<String>,
    pub grade: Option<f64>,
    pub max_grade: Option<f64>,
    pub weight: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub completed: Option<bool>,
}

impl Evaluation {
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        discipline_id: Option<Uuid>,
    ) -> Result<Vec<Evaluation>, DatabaseError> {
        let rows = sqlx::query_as::<_, Evaluation>(
            "SELECT * FROM evaluations
             WHERE user_id = $1 AND ($2::uuid IS NULL OR discipline_id = $2)
             ORDER BY due_date ASC NULLS LAST, title ASC",
        )
        .bind(user_id)
        .bind(discipline_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Evaluation, DatabaseError> {
        sqlx::query_as::<_, Evaluation>("SELECT * FROM evaluations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Evaluation not found".to_string()))
    }

    pub async fn create(pool: &PgPool, user_id: Uuid, new: NewEvaluation) -> Result<Evaluation, DatabaseError> {
        let row = sqlx::query_as::<_, Evaluation>(
            "INSERT INTO evaluations
                (id, user_id, discipline_id, title, kind, grade, max_grade, weight, due_date, completed)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.discipline_id)
        .bind(new.title)
        .bind(new.kind)
        .bind(new.grade)
        .bind(new.max_grade)
        .bind(new.weight)
        .bind(new.due_date)
        .bind(new.completed)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: EvaluationChanges,
    ) -> Result<Evaluation, DatabaseError> {
        sqlx::query_as::<_, Evaluation>(
            "UPDATE evaluations SET
                title = COALESCE($3, title),
                kind = COALESCE($4, kind),
                grade = COALESCE($5, grade),
                max_grade = COALESCE($6, max_grade),
                weight = COALESCE($7, weight),
                due_date = COALESCE($8, due_date),
                completed = COALESCE($9, completed),
                updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.title)
        .bind(changes.kind)
        .bind(changes.grade)
        .bind(changes.max_grade)
        .bind(changes.weight)
        .bind(changes.due_date)
        .bind(changes.completed)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Evaluation not found".to_string()))
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Evaluation, DatabaseError> {
        sqlx::query_as::<_, Evaluation>("DELETE FROM evaluations WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Evaluation not found".to_string()))
    }
}
