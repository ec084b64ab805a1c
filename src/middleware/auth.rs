use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from the platform JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aal: Option<String>,
    pub session_id: Option<Uuid>,
    /// Raw bearer token, forwarded on pass-through calls to the platform
    pub access_token: String,
}

impl AuthUser {
    fn from_claims(claims: Claims, access_token: String) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            aal: claims.aal,
            session_id: claims.session_id,
            access_token,
        }
    }
}

/// JWT authentication middleware that validates tokens and injects `AuthUser`
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;

    let claims = state.verifier.verify(&token).map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        ApiError::unauthorized(e.to_string())
    })?;

    if claims.role.as_deref() == Some("anon") {
        return Err(ApiError::unauthorized("Anonymous tokens cannot access this resource"));
    }

    request.extensions_mut().insert(AuthUser::from_claims(claims, token));

    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
fn extract_bearer(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
