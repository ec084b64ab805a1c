// handlers/public/health.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::state::AppState;

/// GET / - Service banner and route map
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "StudyHub API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Academic organizer backend: disciplines, grades, calendar, groups and study tools",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/auth/whoami, /api/auth/mfa/* (protected)",
                "disciplines": "/api/disciplines[/:id] (protected)",
                "evaluations": "/api/evaluations[/:id] (protected)",
                "calendar": "/api/calendar/events[/:id], /api/calendar/external (protected)",
                "groups": "/api/groups[/:id] (protected)",
                "library": "/api/library[/:id] (protected)",
                "notifications": "/api/notifications[/:id] (protected)",
                "push": "/api/push/* (protected)",
                "gamification": "/api/gamification/* (protected)",
                "ai": "/api/ai/complete (protected)",
            }
        }
    }))
}

/// GET /health - Liveness plus a database round-trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
