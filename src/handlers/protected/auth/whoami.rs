// handlers/protected/auth/whoami.rs - GET /api/auth/whoami

use axum::extract::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aal: Option<String>,
    pub session_id: Option<Uuid>,
}

/// GET /api/auth/whoami - Identity carried by the caller's access token
///
/// No database or platform round-trip: everything comes from the verified
/// claims, so `aal` reflects the assurance level of this exact session.
pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<Identity> {
    Ok(ApiResponse::success(Identity {
        id: user.id,
        email: user.email,
        role: user.role,
        aal: user.aal,
        session_id: user.session_id,
    }))
}
