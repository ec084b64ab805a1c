// handlers/protected/disciplines.rs - /api/disciplines

use std::collections::HashSet;

use axum::extract::{Extension, Path, State};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::discipline::{Discipline, DisciplineChanges, NewDiscipline};
use crate::database::models::evaluation::Evaluation;
use crate::domain::{grades, ordering};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::validation::{parse_id, Validator};

const MAX_NAME: usize = 120;
const MAX_SHORT: usize = 60;
const MAX_BULK_ITEMS: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct DisciplinePayload {
    pub name: Option<String>,
    pub code: Option<String>,
    pub professor: Option<String>,
    pub color: Option<String>,
    pub semester: Option<String>,
    pub workload_hours: Option<i32>,
    pub is_favorite: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct BulkOrderPayload {
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub sort_order: i32,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkOrderResult {
    pub updated: Vec<Uuid>,
    pub failed: Vec<FailedUpdate>,
}

#[derive(Debug, Serialize)]
pub struct FailedUpdate {
    pub id: Uuid,
    pub error: String,
}

fn is_hex_color(value: &str) -> bool {
    let digits = match value.strip_prefix('#') {
        Some(digits) => digits,
        None => return false,
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Shared field checks; `name_required` distinguishes create from patch
fn validate_payload(payload: &DisciplinePayload, name_required: bool) -> Result<DisciplineChanges, ApiError> {
    let mut v = Validator::new();

    let name = if name_required || payload.name.is_some() {
        v.required_text("name", payload.name.as_deref(), MAX_NAME)
    } else {
        None
    };
    let code = v.optional_text("code", payload.code.as_deref(), MAX_SHORT);
    let professor = v.optional_text("professor", payload.professor.as_deref(), MAX_NAME);
    let semester = v.optional_text("semester", payload.semester.as_deref(), MAX_SHORT);
    let color = v.optional_text("color", payload.color.as_deref(), 7);
    if let Some(color) = &color {
        v.check(is_hex_color(color), "color", "must be a hex color like #1e90ff");
    }
    if let Some(hours) = payload.workload_hours {
        v.check((0..=10_000).contains(&hours), "workload_hours", "must be between 0 and 10000");
    }
    if let Some(order) = payload.sort_order {
        v.check(order >= 0, "sort_order", "must not be negative");
    }
    v.finish()?;

    Ok(DisciplineChanges {
        name,
        code,
        professor,
        color,
        semester,
        workload_hours: payload.workload_hours,
        is_favorite: payload.is_favorite,
        sort_order: payload.sort_order,
    })
}

fn validate_bulk(items: &[OrderItem]) -> Result<(), ApiError> {
    let mut v = Validator::new();
    v.check(!items.is_empty(), "items", "must not be empty");
    v.check(
        items.len() <= MAX_BULK_ITEMS,
        "items",
        format!("must contain at most {} entries", MAX_BULK_ITEMS),
    );

    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id) {
            v.add("items", format!("duplicate id {}", item.id));
        }
        if item.sort_order < 0 {
            v.add("sort_order", format!("must not be negative (id {})", item.id));
        }
    }
    v.finish()
}

/// GET /api/disciplines - List the caller's disciplines in display order
pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Discipline>> {
    let disciplines = Discipline::list(&state.pool, user.id).await?;
    Ok(ApiResponse::success(disciplines))
}

/// POST /api/disciplines - Create a discipline
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<DisciplinePayload>,
) -> ApiResult<Discipline> {
    let fields = validate_payload(&payload, true)?;
    let new = NewDiscipline {
        name: fields.name.unwrap_or_default(),
        code: fields.code,
        professor: fields.professor,
        color: fields.color,
        semester: fields.semester,
        workload_hours: fields.workload_hours,
        is_favorite: fields.is_favorite.unwrap_or(false),
    };

    let discipline = Discipline::create(&state.pool, user.id, new).await?;
    tracing::info!("User {} created discipline {}", user.id, discipline.id);
    Ok(ApiResponse::created(discipline))
}

/// GET /api/disciplines/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Discipline> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(Discipline::find(&state.pool, user.id, id).await?))
}

/// PATCH /api/disciplines/:id - Update only the provided fields
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<DisciplinePayload>,
) -> ApiResult<Discipline> {
    let id = parse_id(&id)?;
    let changes = validate_payload(&payload, false)?;
    Ok(ApiResponse::success(Discipline::update(&state.pool, user.id, id, changes).await?))
}

/// DELETE /api/disciplines/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Discipline> {
    let id = parse_id(&id)?;
    let deleted = Discipline::delete(&state.pool, user.id, id).await?;
    tracing::info!("User {} deleted discipline {}", user.id, id);
    Ok(ApiResponse::success(deleted))
}

/// POST /api/disciplines/reorder - Recompute a dense 0..N-1 order
pub async fn reorder(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Discipline>> {
    let current = Discipline::list(&state.pool, user.id).await?;
    let ordered = ordering::resequence(current);
    Discipline::save_order(&state.pool, user.id, &ordered).await?;
    // Re-read so the response carries the new updated_at
    Ok(ApiResponse::success(Discipline::list(&state.pool, user.id).await?))
}

/// PUT /api/disciplines/order - Apply client-chosen indices concurrently
pub async fn bulk_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<BulkOrderPayload>,
) -> ApiResult<BulkOrderResult> {
    validate_bulk(&payload.items)?;

    let pool = &state.pool;
    let user_id = user.id;
    let updates = payload.items.iter().map(|item| async move {
        let outcome = Discipline::set_sort_order(pool, user_id, item.id, item.sort_order).await;
        (item.id, outcome)
    });

    let mut result = BulkOrderResult::default();
    for (id, outcome) in join_all(updates).await {
        match outcome {
            Ok(true) => result.updated.push(id),
            Ok(false) => result.failed.push(FailedUpdate {
                id,
                error: "Discipline not found".to_string(),
            }),
            Err(e) => {
                tracing::error!("Failed to reorder discipline {}: {}", id, e);
                result.failed.push(FailedUpdate {
                    id,
                    error: "Update failed".to_string(),
                });
            }
        }
    }

    if !result.failed.is_empty() {
        tracing::warn!("Bulk reorder for user {}: {} of {} updates failed", user.id, result.failed.len(), payload.items.len());
    }
    Ok(ApiResponse::success(result))
}

/// GET /api/disciplines/:id/summary - Weighted grade summary
pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let discipline = Discipline::find(&state.pool, user.id, id).await?;
    let evaluations = Evaluation::list(&state.pool, user.id, Some(id)).await?;

    Ok(ApiResponse::success(json!({
        "discipline_id": discipline.id,
        "name": discipline.name,
        "scale": grades::GRADE_SCALE,
        "summary": grades::summarize(&evaluations),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_name_patch_does_not() {
        assert!(validate_payload(&DisciplinePayload::default(), true).is_err());
        assert!(validate_payload(&DisciplinePayload::default(), false).is_ok());

        let blank = DisciplinePayload {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(validate_payload(&blank, false).is_err());
    }

    #[test]
    fn validates_colors_and_hours() {
        assert!(is_hex_color("#1e90ff"));
        assert!(is_hex_color("#FFF"));
        assert!(!is_hex_color("1e90ff"));
        assert!(!is_hex_color("#12345"));

        let payload = DisciplinePayload {
            name: Some("Physics".into()),
            color: Some("blue".into()),
            workload_hours: Some(-4),
            ..Default::default()
        };
        let body = validate_payload(&payload, true).unwrap_err().to_json();
        assert_eq!(body["field_errors"]["color"], "must be a hex color like #1e90ff");
        assert_eq!(body["field_errors"]["workload_hours"], "must be between 0 and 10000");
    }

    #[test]
    fn bulk_rejects_empty_duplicates_and_negatives() {
        assert!(validate_bulk(&[]).is_err());

        let id = Uuid::new_v4();
        let dup = [OrderItem { id, sort_order: 0 }, OrderItem { id, sort_order: 1 }];
        assert!(validate_bulk(&dup).is_err());

        let negative = [OrderItem { id, sort_order: -1 }];
        assert!(validate_bulk(&negative).is_err());

        let ok = [
            OrderItem { id, sort_order: 0 },
            OrderItem { id: Uuid::new_v4(), sort_order: 1 },
        ];
        assert!(validate_bulk(&ok).is_ok());
    }
}
