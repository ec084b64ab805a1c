// handlers/protected/groups.rs - /api/groups

use axum::extract::{Extension, Path, State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::database::models::gamification::GamificationEvent;
use crate::database::models::study_group::{
    GroupMember, MemberGroup, NewStudyGroup, StudyGroup, StudyGroupChanges, ROLE_OWNER,
};
use crate::domain::gamification::Action;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::validation::{parse_id, Validator};

const MAX_NAME: usize = 120;
const MAX_DESCRIPTION: usize = 2000;

#[derive(Debug, Default, Deserialize)]
pub struct GroupPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub discipline_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinPayload {
    pub invite_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: StudyGroup,
    pub role: String,
    pub members: Vec<GroupMember>,
}

fn validate_payload(payload: &GroupPayload, name_required: bool) -> Result<StudyGroupChanges, ApiError> {
    let mut v = Validator::new();
    let name = if name_required || payload.name.is_some() {
        v.required_text("name", payload.name.as_deref(), MAX_NAME)
    } else {
        None
    };
    let description = v.optional_text("description", payload.description.as_deref(), MAX_DESCRIPTION);
    let discipline_name = v.optional_text("discipline_name", payload.discipline_name.as_deref(), MAX_NAME);
    v.finish()?;

    Ok(StudyGroupChanges {
        name,
        description,
        discipline_name,
    })
}

/// Membership of the caller, or 403 when they are not in the group
async fn require_member(state: &AppState, group_id: Uuid, user_id: Uuid) -> Result<GroupMember, ApiError> {
    GroupMember::find(&state.pool, group_id, user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You are not a member of this group"))
}

/// Group plus a check that the caller owns it
async fn require_owner(state: &AppState, group_id: Uuid, user_id: Uuid) -> Result<StudyGroup, ApiError> {
    let group = StudyGroup::find(&state.pool, group_id).await?;
    if group.owner_id != user_id {
        return Err(ApiError::forbidden("Only the group owner can do that"));
    }
    Ok(group)
}

/// GET /api/groups - Groups the caller belongs to
pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<MemberGroup>> {
    Ok(ApiResponse::success(StudyGroup::list_for_member(&state.pool, user.id).await?))
}

/// POST /api/groups - Create a group owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> ApiResult<StudyGroup> {
    let fields = validate_payload(&payload, true)?;
    let new = NewStudyGroup {
        name: fields.name.unwrap_or_default(),
        description: fields.description,
        discipline_name: fields.discipline_name,
    };

    let group = StudyGroup::create(&state.pool, user.id, new).await?;
    tracing::info!("User {} created study group {}", user.id, group.id);
    Ok(ApiResponse::created(group))
}

/// GET /api/groups/:id - Group detail with its members
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<GroupDetail> {
    let id = parse_id(&id)?;
    let group = StudyGroup::find(&state.pool, id).await?;
    let membership = require_member(&state, id, user.id).await?;
    let members = GroupMember::list(&state.pool, id).await?;

    Ok(ApiResponse::success(GroupDetail {
        group,
        role: membership.role,
        members,
    }))
}

/// PATCH /api/groups/:id - Owner only
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> ApiResult<StudyGroup> {
    let id = parse_id(&id)?;
    let changes = validate_payload(&payload, false)?;
    require_owner(&state, id, user.id).await?;
    Ok(ApiResponse::success(StudyGroup::update(&state.pool, id, changes).await?))
}

/// DELETE /api/groups/:id - Owner only; memberships cascade
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StudyGroup> {
    let id = parse_id(&id)?;
    require_owner(&state, id, user.id).await?;
    let deleted = StudyGroup::delete(&state.pool, id).await?;
    tracing::info!("User {} deleted study group {}", user.id, id);
    Ok(ApiResponse::success(deleted))
}

/// POST /api/groups/join - Join by invite code
pub async fn join(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<JoinPayload>,
) -> ApiResult<GroupMember> {
    let mut v = Validator::new();
    let code = v.required_text("invite_code", payload.invite_code.as_deref(), 32);
    v.finish()?;
    let code = code.unwrap_or_default().to_uppercase();

    let group = StudyGroup::find_by_invite_code(&state.pool, &code).await?;
    if GroupMember::find(&state.pool, group.id, user.id).await?.is_some() {
        return Err(ApiError::conflict("You are already a member of this group"));
    }
    let member = GroupMember::add(&state.pool, group.id, user.id).await?;

    if let Err(e) =
        GamificationEvent::record(&state.pool, user.id, Action::GroupJoined, json!({ "group_id": group.id })).await
    {
        tracing::warn!("Failed to award points for joining group {}: {}", group.id, e);
    }

    tracing::info!("User {} joined study group {}", user.id, group.id);
    Ok(ApiResponse::created(member))
}

/// POST /api/groups/:id/leave - Members leave; the owner must delete instead
pub async fn leave(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let id = parse_id(&id)?;
    let membership = require_member(&state, id, user.id).await?;
    if membership.role == ROLE_OWNER {
        return Err(ApiError::bad_request("The owner cannot leave the group; delete it instead"));
    }

    GroupMember::remove(&state.pool, id, user.id).await?;
    Ok(ApiResponse::success(json!({ "group_id": id, "left": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_required_on_create_only() {
        assert!(validate_payload(&GroupPayload::default(), true).is_err());
        let changes = validate_payload(
            &GroupPayload {
                description: Some("Weekly calculus prep".into()),
                ..Default::default()
            },
            false,
        )
        .unwrap();
        assert!(changes.name.is_none());
        assert_eq!(changes.description.as_deref(), Some("Weekly calculus prep"));
    }
}
