// handlers/protected/calendar.rs - /api/calendar

use axum::extract::{Extension, Path, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::calendar_event::{CalendarEvent, CalendarEventChanges, NewCalendarEvent};
use crate::database::models::discipline::Discipline;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::ExternalEvent;
use crate::state::AppState;
use crate::validation::{parse_id, Validator};

pub const PROVIDER_TOKEN_HEADER: &str = "x-provider-token";

const MAX_TITLE: usize = 200;
const MAX_DESCRIPTION: usize = 4000;
const DEFAULT_EXTERNAL_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventPayload {
    pub discipline_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
}

fn check_window(query: &WindowQuery) -> Result<(), ApiError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if to < from {
            return Err(ApiError::field("to", "must not precede from"));
        }
    }
    Ok(())
}

fn validate_new(payload: &EventPayload) -> Result<NewCalendarEvent, ApiError> {
    let mut v = Validator::new();
    let title = v.required_text("title", payload.title.as_deref(), MAX_TITLE);
    let description = v.optional_text("description", payload.description.as_deref(), MAX_DESCRIPTION);

    let starts_at = payload.starts_at;
    if starts_at.is_none() {
        v.add("starts_at", "is required");
    }
    let starts_at = starts_at.unwrap_or_else(Utc::now);
    let ends_at = payload.ends_at.unwrap_or(starts_at + Duration::hours(1));
    v.check(ends_at >= starts_at, "ends_at", "must not precede starts_at");
    v.finish()?;

    Ok(NewCalendarEvent {
        discipline_id: payload.discipline_id,
        title: title.unwrap_or_default(),
        description,
        starts_at,
        ends_at,
        all_day: payload.all_day.unwrap_or(false),
    })
}

fn validate_changes(payload: &EventPayload, current: &CalendarEvent) -> Result<CalendarEventChanges, ApiError> {
    let mut v = Validator::new();
    let title = match payload.title.as_deref() {
        Some(raw) => v.required_text("title", Some(raw), MAX_TITLE),
        None => None,
    };
    let description = v.optional_text("description", payload.description.as_deref(), MAX_DESCRIPTION);

    let starts_at = payload.starts_at.unwrap_or(current.starts_at);
    let ends_at = payload.ends_at.unwrap_or(current.ends_at);
    v.check(ends_at >= starts_at, "ends_at", "must not precede starts_at");
    v.finish()?;

    Ok(CalendarEventChanges {
        discipline_id: payload.discipline_id,
        title,
        description,
        starts_at: payload.starts_at,
        ends_at: payload.ends_at,
        all_day: payload.all_day,
    })
}

/// OAuth token for the external calendar, passed by the client alongside its session
fn provider_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(PROVIDER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(format!("Missing {} header", PROVIDER_TOKEN_HEADER)))
}

async fn ensure_discipline(state: &AppState, user_id: Uuid, discipline_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(discipline_id) = discipline_id {
        Discipline::find(&state.pool, user_id, discipline_id).await?;
    }
    Ok(())
}

/// GET /api/calendar/events - Local events overlapping the window
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> ApiResult<Vec<CalendarEvent>> {
    check_window(&query)?;
    let events = CalendarEvent::list_between(&state.pool, user.id, query.from, query.to).await?;
    Ok(ApiResponse::success(events))
}

/// POST /api/calendar/events
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<EventPayload>,
) -> ApiResult<CalendarEvent> {
    let new = validate_new(&payload)?;
    ensure_discipline(&state, user.id, new.discipline_id).await?;

    let event = CalendarEvent::create(&state.pool, user.id, new).await?;
    Ok(ApiResponse::created(event))
}

/// PATCH /api/calendar/events/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<EventPayload>,
) -> ApiResult<CalendarEvent> {
    let id = parse_id(&id)?;
    let current = CalendarEvent::find(&state.pool, user.id, id).await?;
    let changes = validate_changes(&payload, &current)?;
    ensure_discipline(&state, user.id, changes.discipline_id).await?;

    Ok(ApiResponse::success(CalendarEvent::update(&state.pool, user.id, id, changes).await?))
}

/// DELETE /api/calendar/events/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<CalendarEvent> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(CalendarEvent::delete(&state.pool, user.id, id).await?))
}

/// POST /api/calendar/events/:id/sync - Push a local event to the external calendar
pub async fn sync(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<CalendarEvent> {
    let token = provider_token(&headers)?;
    let id = parse_id(&id)?;
    let event = CalendarEvent::find(&state.pool, user.id, id).await?;

    let remote = state.calendar.upsert_event(&token, &event).await?;
    let synced = CalendarEvent::set_external_id(&state.pool, user.id, id, &remote.id).await?;

    tracing::info!("Synced event {} to external calendar as {}", id, remote.id);
    Ok(ApiResponse::success(synced))
}

/// GET /api/calendar/external - Events from the external calendar
pub async fn external(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> ApiResult<Vec<ExternalEvent>> {
    let token = provider_token(&headers)?;
    check_window(&query)?;

    let from = query.from.unwrap_or_else(Utc::now);
    let to = query.to.unwrap_or(from + Duration::days(DEFAULT_EXTERNAL_WINDOW_DAYS));
    let events = state.calendar.list_events(&token, from, to).await?;
    Ok(ApiResponse::success(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    #[test]
    fn ends_at_defaults_to_one_hour() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
        let payload = EventPayload {
            title: Some("Study session".into()),
            starts_at: Some(start),
            ..Default::default()
        };
        let new = validate_new(&payload).unwrap();
        assert_eq!(new.ends_at, start + Duration::hours(1));
        assert!(!new.all_day);
    }

    #[test]
    fn rejects_inverted_ranges() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
        let payload = EventPayload {
            title: Some("Lab".into()),
            starts_at: Some(start),
            ends_at: Some(start - Duration::minutes(5)),
            ..Default::default()
        };
        let body = validate_new(&payload).unwrap_err().to_json();
        assert_eq!(body["field_errors"]["ends_at"], "must not precede starts_at");

        let missing = validate_new(&EventPayload::default()).unwrap_err().to_json();
        assert_eq!(missing["field_errors"]["starts_at"], "is required");
        assert_eq!(missing["field_errors"]["title"], "is required");

        let window = WindowQuery {
            from: Some(start),
            to: Some(start - Duration::days(1)),
        };
        assert!(check_window(&window).is_err());
    }

    #[test]
    fn reads_provider_token_header() {
        let mut headers = HeaderMap::new();
        assert!(provider_token(&headers).is_err());
        headers.insert(PROVIDER_TOKEN_HEADER, HeaderValue::from_static("ya29.token"));
        assert_eq!(provider_token(&headers).unwrap(), "ya29.token");
    }
}
