use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MEMBER: &str = "member";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudyGroup {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub discipline_name: Option<String>,
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A group as seen by one of its members
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberGroup {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: StudyGroup,
    pub role: String,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudyGroup {
    pub name: String,
    pub description: Option<String>,
    pub discipline_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudyGroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub discipline_name: Option<String>,
}

pub const INVITE_CODE_LEN: usize = 8;
const INVITE_CODE_ATTEMPTS: usize = 5;
const INVITE_CODE_CONSTRAINT: &str = "study_groups_invite_code_key";

/// 32 symbols without the easily confused 0/O and 1/I
const INVITE_ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Eight symbols (40 random bits) drawn from the random bytes of a v4 UUID
pub fn generate_invite_code() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let bits = bytes[..5].iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    (0..INVITE_CODE_LEN)
        .rev()
        .map(|i| INVITE_ALPHABET[((bits >> (i * 5)) & 0x1f) as usize] as char)
        .collect()
}

fn is_invite_code_collision(err: &DatabaseError) -> bool {
    matches!(
        err,
        DatabaseError::Sqlx(sqlx::Error::Database(db_err))
            if db_err.is_unique_violation() && db_err.constraint() == Some(INVITE_CODE_CONSTRAINT)
    )
}

impl StudyGroup {
    pub async fn list_for_member(pool: &PgPool, user_id: Uuid) -> Result<Vec<MemberGroup>, DatabaseError> {
        let rows = sqlx::query_as::<_, MemberGroup>(
            "SELECT g.*, m.role,
                (SELECT COUNT(*) FROM study_group_members c WHERE c.group_id = g.id) AS member_count
             FROM study_groups g
             JOIN study_group_members m ON m.group_id = g.id
             WHERE m.user_id = $1
             ORDER BY g.name ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<StudyGroup, DatabaseError> {
        sqlx::query_as::<_, StudyGroup>("SELECT * FROM study_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Study group not found".to_string()))
    }

    pub async fn find_by_invite_code(pool: &PgPool, code: &str) -> Result<StudyGroup, DatabaseError> {
        sqlx::query_as::<_, StudyGroup>("SELECT * FROM study_groups WHERE invite_code = $1")
            .bind(code.trim().to_uppercase())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Invite code not found".to_string()))
    }

    /// Create the group and its owner membership atomically
    pub async fn create(pool: &PgPool, owner_id: Uuid, new: NewStudyGroup) -> Result<StudyGroup, DatabaseError> {
        Self::create_with_codes(pool, owner_id, &new, generate_invite_code).await
    }

    /// `create` with the invite-code source supplied; a code that is already
    /// taken is replaced by the next one, up to a fixed number of attempts.
    pub async fn create_with_codes(
        pool: &PgPool,
        owner_id: Uuid,
        new: &NewStudyGroup,
        mut next_code: impl FnMut() -> String,
    ) -> Result<StudyGroup, DatabaseError> {
        let mut attempt = 1;
        loop {
            match Self::insert_with_owner(pool, owner_id, new, &next_code()).await {
                Err(e) if is_invite_code_collision(&e) && attempt < INVITE_CODE_ATTEMPTS => {
                    tracing::debug!("Invite code collision on attempt {}, retrying", attempt);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn insert_with_owner(
        pool: &PgPool,
        owner_id: Uuid,
        new: &NewStudyGroup,
        invite_code: &str,
    ) -> Result<StudyGroup, DatabaseError> {
        let mut tx = pool.begin().await?;

        let group = sqlx::query_as::<_, StudyGroup>(
            "INSERT INTO study_groups (id, owner_id, name, description, discipline_name, invite_code)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.discipline_name)
        .bind(invite_code)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO study_group_members (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(group.id)
            .bind(owner_id)
            .bind(ROLE_OWNER)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: StudyGroupChanges) -> Result<StudyGroup, DatabaseError> {
        sqlx::query_as::<_, StudyGroup>(
            "UPDATE study_groups SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                discipline_name = COALESCE($4, discipline_name),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.discipline_name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Study group not found".to_string()))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<StudyGroup, DatabaseError> {
        sqlx::query_as::<_, StudyGroup>("DELETE FROM study_groups WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Study group not found".to_string()))
    }
}

impl GroupMember {
    pub async fn find(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<Option<GroupMember>, DatabaseError> {
        let row = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM study_group_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn list(pool: &PgPool, group_id: Uuid) -> Result<Vec<GroupMember>, DatabaseError> {
        let rows = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM study_group_members WHERE group_id = $1 ORDER BY joined_at ASC",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Insert a plain membership; a duplicate surfaces as a unique violation
    pub async fn add(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<GroupMember, DatabaseError> {
        let row = sqlx::query_as::<_, GroupMember>(
            "INSERT INTO study_group_members (group_id, user_id, role) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(ROLE_MEMBER)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn remove(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM study_group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
