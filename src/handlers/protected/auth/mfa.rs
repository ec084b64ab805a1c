// handlers/protected/auth/mfa.rs - /api/auth/mfa/*
//
// Thin pass-through to the platform's MFA API. The platform owns the TOTP
// secrets and the challenge state; these handlers only validate input and
// forward the caller's own access token.

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::validation::Validator;

const MAX_ID: usize = 64;
const MAX_FRIENDLY_NAME: usize = 64;
const CODE_DIGITS: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct EnrollPayload {
    pub friendly_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FactorPayload {
    pub factor_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyPayload {
    pub factor_id: Option<String>,
    pub challenge_id: Option<String>,
    pub code: Option<String>,
}

fn is_totp_code(code: &str) -> bool {
    code.len() == CODE_DIGITS && code.chars().all(|c| c.is_ascii_digit())
}

fn require_factor(payload: &FactorPayload) -> Result<String, ApiError> {
    let mut v = Validator::new();
    let factor_id = v.required_text("factor_id", payload.factor_id.as_deref(), MAX_ID);
    v.finish()?;
    Ok(factor_id.unwrap_or_default())
}

/// (factor_id, challenge_id, code)
fn validate_verify(payload: &VerifyPayload) -> Result<(String, String, String), ApiError> {
    let mut v = Validator::new();
    let factor_id = v.required_text("factor_id", payload.factor_id.as_deref(), MAX_ID);
    let challenge_id = v.required_text("challenge_id", payload.challenge_id.as_deref(), MAX_ID);
    let code = v.required_text("code", payload.code.as_deref(), CODE_DIGITS);
    if let Some(code) = &code {
        v.check(is_totp_code(code), "code", format!("must be {} digits", CODE_DIGITS));
    }
    v.finish()?;
    Ok((
        factor_id.unwrap_or_default(),
        challenge_id.unwrap_or_default(),
        code.unwrap_or_default(),
    ))
}

/// GET /api/auth/mfa/factors
pub async fn factors(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(state.platform_auth.list_factors(&user.access_token).await?))
}

/// POST /api/auth/mfa/enroll - Start TOTP enrollment; returns the QR code and secret
pub async fn enroll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<EnrollPayload>,
) -> ApiResult<Value> {
    let mut v = Validator::new();
    let friendly_name = v.optional_text("friendly_name", payload.friendly_name.as_deref(), MAX_FRIENDLY_NAME);
    v.finish()?;

    let factor = state
        .platform_auth
        .enroll_totp(&user.access_token, friendly_name.as_deref())
        .await?;
    tracing::info!("User {} started MFA enrollment", user.id);
    Ok(ApiResponse::created(factor))
}

/// POST /api/auth/mfa/challenge
pub async fn challenge(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<FactorPayload>,
) -> ApiResult<Value> {
    let factor_id = require_factor(&payload)?;
    Ok(ApiResponse::success(
        state.platform_auth.challenge(&user.access_token, &factor_id).await?,
    ))
}

/// POST /api/auth/mfa/verify - Returns the upgraded (aal2) session
pub async fn verify(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<VerifyPayload>,
) -> ApiResult<Value> {
    let (factor_id, challenge_id, code) = validate_verify(&payload)?;
    let session = state
        .platform_auth
        .verify(&user.access_token, &factor_id, &challenge_id, &code)
        .await?;
    tracing::info!("User {} verified MFA factor {}", user.id, factor_id);
    Ok(ApiResponse::success(session))
}

/// POST /api/auth/mfa/unenroll
pub async fn unenroll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<FactorPayload>,
) -> ApiResult<Value> {
    let factor_id = require_factor(&payload)?;
    let result = state.platform_auth.unenroll(&user.access_token, &factor_id).await?;
    tracing::info!("User {} removed MFA factor {}", user.id, factor_id);
    Ok(ApiResponse::success(result))
}
