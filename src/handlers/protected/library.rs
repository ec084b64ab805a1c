// handlers/protected/library.rs - /api/library

use axum::extract::{Extension, Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::discipline::Discipline;
use crate::database::models::library_material::{
    LibraryFilter, LibraryMaterial, LibraryMaterialChanges, NewLibraryMaterial, MATERIAL_KINDS,
};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::validation::{parse_id, Validator};

const MAX_TITLE: usize = 200;
const MAX_URL: usize = 2048;
const MAX_CONTENT: usize = 50_000;
const MAX_TAGS: usize = 20;
const MAX_TAG: usize = 40;

#[derive(Debug, Default, Deserialize)]
pub struct LibraryQuery {
    pub discipline_id: Option<Uuid>,
    pub q: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaterialPayload {
    pub discipline_id: Option<Uuid>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Trim, lowercase and dedupe tags, dropping blanks
fn normalize_tags(v: &mut Validator, tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || normalized.contains(&tag) {
            continue;
        }
        if tag.chars().count() > MAX_TAG {
            v.add("tags", format!("each tag must be at most {} characters", MAX_TAG));
            continue;
        }
        normalized.push(tag);
    }
    v.check(normalized.len() <= MAX_TAGS, "tags", format!("at most {} tags", MAX_TAGS));
    normalized
}

fn check_url(v: &mut Validator, url: &Option<String>) {
    if let Some(url) = url {
        v.check(url::Url::parse(url).is_ok(), "url", "must be an absolute URL");
    }
}

fn validate_new(payload: &MaterialPayload) -> Result<NewLibraryMaterial, ApiError> {
    let mut v = Validator::new();
    let title = v.required_text("title", payload.title.as_deref(), MAX_TITLE);
    let kind = payload.kind.as_deref().map(|k| k.trim().to_lowercase()).unwrap_or_default();
    if kind.is_empty() {
        v.add("kind", "is required");
    } else {
        v.one_of("kind", &kind, MATERIAL_KINDS);
    }

    let url = v.optional_text("url", payload.url.as_deref(), MAX_URL);
    let content = v.optional_text("content", payload.content.as_deref(), MAX_CONTENT);
    match kind.as_str() {
        "link" | "file" => v.check(url.is_some(), "url", format!("is required for {} materials", kind)),
        "note" => v.check(content.is_some(), "content", "is required for notes"),
        _ => {}
    }
    check_url(&mut v, &url);
    let tags = normalize_tags(&mut v, payload.tags.as_deref().unwrap_or_default());
    v.finish()?;

    Ok(NewLibraryMaterial {
        discipline_id: payload.discipline_id,
        title: title.unwrap_or_default(),
        kind,
        url,
        content,
        tags,
    })
}

fn validate_changes(payload: &MaterialPayload) -> Result<LibraryMaterialChanges, ApiError> {
    let mut v = Validator::new();
    if payload.kind.is_some() {
        v.add("kind", "cannot be changed");
    }
    let title = match payload.title.as_deref() {
        Some(raw) => v.required_text("title", Some(raw), MAX_TITLE),
        None => None,
    };
    let url = v.optional_text("url", payload.url.as_deref(), MAX_URL);
    check_url(&mut v, &url);
    let content = v.optional_text("content", payload.content.as_deref(), MAX_CONTENT);
    let tags = payload.tags.as_deref().map(|tags| normalize_tags(&mut v, tags));
    v.finish()?;

    Ok(LibraryMaterialChanges {
        discipline_id: payload.discipline_id,
        title,
        url,
        content,
        tags,
    })
}

async fn ensure_discipline(state: &AppState, user_id: Uuid, discipline_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(discipline_id) = discipline_id {
        Discipline::find(&state.pool, user_id, discipline_id).await?;
    }
    Ok(())
}

/// GET /api/library - Filter by discipline, title search and tag
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<LibraryQuery>,
) -> ApiResult<Vec<LibraryMaterial>> {
    let filter = LibraryFilter {
        discipline_id: query.discipline_id,
        search: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        tag: query.tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()),
    };
    Ok(ApiResponse::success(LibraryMaterial::list(&state.pool, user.id, filter).await?))
}

/// POST /api/library
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<MaterialPayload>,
) -> ApiResult<LibraryMaterial> {
    let new = validate_new(&payload)?;
    ensure_discipline(&state, user.id, new.discipline_id).await?;
    Ok(ApiResponse::created(LibraryMaterial::create(&state.pool, user.id, new).await?))
}

/// GET /api/library/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<LibraryMaterial> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(LibraryMaterial::find(&state.pool, user.id, id).await?))
}

/// PATCH /api/library/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<MaterialPayload>,
) -> ApiResult<LibraryMaterial> {
    let id = parse_id(&id)?;
    let changes = validate_changes(&payload)?;
    ensure_discipline(&state, user.id, changes.discipline_id).await?;
    Ok(ApiResponse::success(LibraryMaterial::update(&state.pool, user.id, id, changes).await?))
}

/// DELETE /api/library/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<LibraryMaterial> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(LibraryMaterial::delete(&state.pool, user.id, id).await?))
}
