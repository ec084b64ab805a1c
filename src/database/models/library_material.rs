use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

pub const MATERIAL_KINDS: &[&str] = &["link", "file", "note"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LibraryMaterial {
    pub id: Uuid,
    pub user_id: Uuid,
    pub discipline_id: Option<Uuid>,
    pub title: String,
    pub kind: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLibraryMaterial {
    pub discipline_id: Option<Uuid>,
    pub title: String,
    pub kind: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LibraryMaterialChanges {
    pub discipline_id: Option<Uuid>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    pub discipline_id: Option<Uuid>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl LibraryMaterial {
    pub async fn list(pool: &PgPool, user_id: Uuid, filter: LibraryFilter) -> Result<Vec<LibraryMaterial>, DatabaseError> {
        let pattern = filter.search.map(|q| format!("%{}%", escape_like(&q)));
        let rows = sqlx::query_as::<_, LibraryMaterial>(
            "SELECT * FROM library_materials
             WHERE user_id = $1
               AND ($2::uuid IS NULL OR discipline_id = $2)
               AND ($3::text IS NULL OR title ILIKE $3)
               AND ($4::text IS NULL OR $4 = ANY(tags))
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(filter.discipline_id)
        .bind(pattern)
        .bind(filter.tag)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<LibraryMaterial, DatabaseError> {
        sqlx::query_as::<_, LibraryMaterial>("SELECT * FROM library_materials WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Material not found".to_string()))
    }

    pub async fn create(pool: &PgPool, user_id: Uuid, new: NewLibraryMaterial) -> Result<LibraryMaterial, DatabaseError> {
        let row = sqlx::query_as::<_, LibraryMaterial>(
            "INSERT INTO library_materials (id, user_id, discipline_id, title, kind, url, content, tags)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.discipline_id)
        .bind(new.title)
        .bind(new.kind)
        .bind(new.url)
        .bind(new.content)
        .bind(new.tags)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: LibraryMaterialChanges,
    ) -> Result<LibraryMaterial, DatabaseError> {
        sqlx::query_as::<_, LibraryMaterial>(
            "UPDATE library_materials SET
                discipline_id = COALESCE($3, discipline_id),
                title = COALESCE($4, title),
                url = COALESCE($5, url),
                content = COALESCE($6, content),
                tags = COALESCE($7, tags),
                updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.discipline_id)
        .bind(changes.title)
        .bind(changes.url)
        .bind(changes.content)
        .bind(changes.tags)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Material not found".to_string()))
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<LibraryMaterial, DatabaseError> {
        sqlx::query_as::<_, LibraryMaterial>("DELETE FROM library_materials WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Material not found".to_string()))
    }
}

/// Escape LIKE wildcards so a search matches literally
fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
