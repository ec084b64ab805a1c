// handlers/protected/evaluations.rs - /api/evaluations

use axum::extract::{Extension, Path, State};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::discipline::Discipline;
use crate::database::models::evaluation::{Evaluation, EvaluationChanges, NewEvaluation, EVALUATION_KINDS};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::validation::{parse_id, Validator};

const MAX_TITLE: usize = 200;
const DEFAULT_KIND: &str = "exam";
const DEFAULT_MAX_GRADE: f64 = 10.0;
const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Default, Deserialize)]
pub struct EvaluationQuery {
    pub discipline_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EvaluationPayload {
    pub discipline_id: Option<Uuid>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub grade: Option<f64>,
    pub max_grade: Option<f64>,
    pub weight: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub completed: Option<bool>,
}

fn validate_new(payload: &EvaluationPayload) -> Result<NewEvaluation, ApiError> {
    let mut v = Validator::new();

    if payload.discipline_id.is_none() {
        v.add("discipline_id", "is required");
    }
    let title = v.required_text("title", payload.title.as_deref(), MAX_TITLE);
    let kind = payload.kind.as_deref().map(str::trim).unwrap_or(DEFAULT_KIND).to_lowercase();
    v.one_of("kind", &kind, EVALUATION_KINDS);

    let max_grade = payload.max_grade.unwrap_or(DEFAULT_MAX_GRADE);
    v.positive("max_grade", max_grade);
    let weight = payload.weight.unwrap_or(DEFAULT_WEIGHT);
    v.positive("weight", weight);
    if let Some(grade) = payload.grade {
        v.within("grade", grade, 0.0, max_grade);
    }
    v.finish()?;

    Ok(NewEvaluation {
        discipline_id: payload.discipline_id.unwrap_or_default(),
        title: title.unwrap_or_default(),
        kind,
        grade: payload.grade,
        max_grade,
        weight,
        due_date: payload.due_date,
        completed: payload.completed.unwrap_or(false),
    })
}

/// Patch checks that need the stored row: the grade bound depends on the
/// effective max_grade after the patch is applied.
fn validate_changes(payload: &EvaluationPayload, current: &Evaluation) -> Result<EvaluationChanges, ApiError> {
    let mut v = Validator::new();

    if payload.discipline_id.is_some() {
        v.add("discipline_id", "cannot be changed; create a new evaluation instead");
    }
    let title = match payload.title.as_deref() {
        Some(raw) => v.required_text("title", Some(raw), MAX_TITLE),
        None => None,
    };
    let kind = payload.kind.as_deref().map(|k| k.trim().to_lowercase());
    if let Some(kind) = &kind {
        v.one_of("kind", kind, EVALUATION_KINDS);
    }
    if let Some(max_grade) = payload.max_grade {
        v.positive("max_grade", max_grade);
    }
    if let Some(weight) = payload.weight {
        v.positive("weight", weight);
    }

    let max_grade = payload.max_grade.unwrap_or(current.max_grade);
    match payload.grade.or(current.grade) {
        Some(grade) if payload.grade.is_some() || payload.max_grade.is_some() => {
            v.within("grade", grade, 0.0, max_grade);
        }
        _ => {}
    }
    v.finish()?;

    Ok(EvaluationChanges {
        title,
        kind,
        grade: payload.grade,
        max_grade: payload.max_grade,
        weight: payload.weight,
        due_date: payload.due_date,
        completed: payload.completed,
    })
}

/// GET /api/evaluations - List evaluations, optionally for one discipline
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<EvaluationQuery>,
) -> ApiResult<Vec<Evaluation>> {
    let evaluations = Evaluation::list(&state.pool, user.id, query.discipline_id).await?;
    Ok(ApiResponse::success(evaluations))
}

/// POST /api/evaluations - Create an evaluation under an owned discipline
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<EvaluationPayload>,
) -> ApiResult<Evaluation> {
    let new = validate_new(&payload)?;

    // Ownership check: another user's discipline reads as missing
    Discipline::find(&state.pool, user.id, new.discipline_id).await?;

    let evaluation = Evaluation::create(&state.pool, user.id, new).await?;
    tracing::info!("User {} created evaluation {}", user.id, evaluation.id);
    Ok(ApiResponse::created(evaluation))
}

/// PATCH /api/evaluations/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<EvaluationPayload>,
) -> ApiResult<Evaluation> {
    let id = parse_id(&id)?;
    let current = Evaluation::find(&state.pool, user.id, id).await?;
    let changes = validate_changes(&payload, &current)?;
    Ok(ApiResponse::success(Evaluation::update(&state.pool, user.id, id, changes).await?))
}

/// DELETE /api/evaluations/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Evaluation> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(Evaluation::delete(&state.pool, user.id, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(grade: Option<f64>, max_grade: f64) -> Evaluation {
        Evaluation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            discipline_id: Uuid::new_v4(),
            title: "Midterm".into(),
            kind: "exam".into(),
            grade,
            max_grade,
            weight: 1.0,
            due_date: None,
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_applies_defaults() {
        let payload = EvaluationPayload {
            discipline_id: Some(Uuid::new_v4()),
            title: Some(" Final exam ".into()),
            ..Default::default()
        };
        let new = validate_new(&payload).unwrap();
        assert_eq!(new.title, "Final exam");
        assert_eq!(new.kind, "exam");
        assert_eq!(new.max_grade, 10.0);
        assert_eq!(new.weight, 1.0);
        assert!(!new.completed);
    }

    #[test]
    fn create_rejects_out_of_range_values() {
        let payload = EvaluationPayload {
            title: Some("Quiz".into()),
            kind: Some("party".into()),
            grade: Some(12.0),
            weight: Some(0.0),
            ..Default::default()
        };
        let body = validate_new(&payload).unwrap_err().to_json();
        let fields = &body["field_errors"];
        assert_eq!(fields["discipline_id"], "is required");
        assert_eq!(fields["weight"], "must be greater than 0");
        assert_eq!(fields["grade"], "must be between 0 and 10");
        assert!(fields["kind"].as_str().unwrap().starts_with("must be one of"));
    }

    #[test]
    fn patch_checks_grade_against_effective_max() {
        let current = stored(Some(8.0), 10.0);

        let shrink = EvaluationPayload {
            max_grade: Some(5.0),
            ..Default::default()
        };
        assert!(validate_changes(&shrink, &current).is_err());

        let grade_only = EvaluationPayload {
            grade: Some(9.5),
            ..Default::default()
        };
        assert!(validate_changes(&grade_only, &current).is_ok());

        let rescale = EvaluationPayload {
            grade: Some(18.0),
            max_grade: Some(20.0),
            ..Default::default()
        };
        assert!(validate_changes(&rescale, &current).is_ok());
    }
}
