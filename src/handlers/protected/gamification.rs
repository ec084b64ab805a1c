// handlers/protected/gamification.rs - /api/gamification

use axum::extract::{Extension, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::models::gamification::GamificationEvent;
use crate::domain::gamification::{self, Action, Progress};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::validation::clamp_limit;

const RECENT_EVENTS: i64 = 10;
const STREAK_LOOKBACK_DAYS: i64 = 366;
const DEFAULT_LEDGER_LIMIT: i64 = 50;
const MAX_LEDGER_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct AwardPayload {
    pub action: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AwardResult {
    pub awarded: bool,
    pub action: Action,
    pub points: i32,
    pub event: Option<GamificationEvent>,
    pub progress: Progress,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub progress: Progress,
    pub streak_days: u32,
    pub recent: Vec<GamificationEvent>,
}

fn parse_action(payload: &AwardPayload) -> Result<Action, ApiError> {
    let raw = payload.action.as_deref().map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ApiError::field("action", "is required"));
    }
    raw.parse::<Action>().map_err(|e| ApiError::field("action", e))
}

/// POST /api/gamification/award - Record points for an action
pub async fn award(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<AwardPayload>,
) -> ApiResult<AwardResult> {
    let action = parse_action(&payload)?;
    let metadata = match payload.metadata {
        Some(value @ Value::Object(_)) => value,
        Some(Value::Null) | None => Value::Object(Default::default()),
        Some(_) => return Err(ApiError::field("metadata", "must be an object")),
    };

    let event = GamificationEvent::record(&state.pool, user.id, action, metadata).await?;
    if event.is_none() {
        tracing::debug!("User {} already earned {} today", user.id, action.as_str());
    }

    let total = GamificationEvent::total_points(&state.pool, user.id).await?;
    Ok(ApiResponse::success(AwardResult {
        awarded: event.is_some(),
        action,
        points: if event.is_some() { action.points() } else { 0 },
        event,
        progress: gamification::progress(total),
    }))
}

/// GET /api/gamification/profile - Points, level and streak
pub async fn profile(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Profile> {
    let total = GamificationEvent::total_points(&state.pool, user.id).await?;
    let days = GamificationEvent::active_days(&state.pool, user.id, STREAK_LOOKBACK_DAYS).await?;
    let recent = GamificationEvent::recent(&state.pool, user.id, RECENT_EVENTS).await?;

    Ok(ApiResponse::success(Profile {
        progress: gamification::progress(total),
        streak_days: gamification::streak(&days, Utc::now().date_naive()),
        recent,
    }))
}

/// GET /api/gamification/ledger - Most recent point events
pub async fn ledger(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<LedgerQuery>,
) -> ApiResult<Vec<GamificationEvent>> {
    let limit = clamp_limit(query.limit, DEFAULT_LEDGER_LIMIT, MAX_LEDGER_LIMIT);
    Ok(ApiResponse::success(GamificationEvent::recent(&state.pool, user.id, limit).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_is_required_and_known() {
        let missing = parse_action(&AwardPayload::default()).unwrap_err().to_json();
        assert_eq!(missing["field_errors"]["action"], "is required");

        let unknown = AwardPayload {
            action: Some("speedrun".into()),
            metadata: None,
        };
        let body = parse_action(&unknown).unwrap_err().to_json();
        assert!(body["field_errors"]["action"].as_str().unwrap().contains("daily_login"));

        let known = AwardPayload {
            action: Some(" study_session ".into()),
            metadata: None,
        };
        assert_eq!(parse_action(&known).unwrap(), Action::StudySession);
    }
}
