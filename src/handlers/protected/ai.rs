// handlers/protected/ai.rs - /api/ai

use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::discipline::Discipline;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::{Completion, CompletionRequest};
use crate::state::AppState;
use crate::validation::Validator;

const BASE_PROMPT: &str = "You are a concise study assistant for a university student. \
Explain concepts clearly, suggest study strategies and answer in the language of the question.";

#[derive(Debug, Default, Deserialize)]
pub struct CompletePayload {
    pub prompt: Option<String>,
    pub discipline_id: Option<Uuid>,
}

fn validate_prompt(payload: &CompletePayload, max_chars: usize) -> Result<String, ApiError> {
    let mut v = Validator::new();
    let prompt = v.required_text("prompt", payload.prompt.as_deref(), max_chars);
    v.finish()?;
    Ok(prompt.unwrap_or_default())
}

fn system_prompt(discipline: Option<&Discipline>) -> String {
    match discipline {
        Some(d) => format!("{} The student is asking about the discipline \"{}\".", BASE_PROMPT, d.name),
        None => BASE_PROMPT.to_string(),
    }
}

/// POST /api/ai/complete - Ask the study assistant
pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CompletePayload>,
) -> ApiResult<Completion> {
    let prompt = validate_prompt(&payload, state.limits.max_prompt_chars)?;

    let discipline = match payload.discipline_id {
        Some(id) => Some(Discipline::find(&state.pool, user.id, id).await?),
        None => None,
    };

    let request = CompletionRequest {
        system: system_prompt(discipline.as_ref()),
        prompt,
    };
    let completion = state.ai.complete(&request).await?;
    tracing::debug!("AI completion for user {} via {}", user.id, completion.model);
    Ok(ApiResponse::success(completion))
}
