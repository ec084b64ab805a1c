// app.rs - Router assembly
//
// Public routes sit at the root; everything under /api/* goes through the
// platform JWT middleware via `route_layer`, so unmatched paths still 404.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    let body_limit = state.limits.max_request_size_bytes;

    let api = Router::new()
        .merge(auth_routes())
        .merge(discipline_routes())
        .merge(evaluation_routes())
        .merge(calendar_routes())
        .merge(group_routes())
        .merge(library_routes())
        .merge(notification_routes())
        .merge(push_routes())
        .merge(gamification_routes())
        .merge(ai_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(api)
        .fallback(not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use protected::auth::{self, mfa};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/mfa/factors", get(mfa::factors))
        .route("/api/auth/mfa/enroll", post(mfa::enroll))
        .route("/api/auth/mfa/challenge", post(mfa::challenge))
        .route("/api/auth/mfa/verify", post(mfa::verify))
        .route("/api/auth/mfa/unenroll", post(mfa::unenroll))
}

fn discipline_routes() -> Router<AppState> {
    use protected::disciplines;

    Router::new()
        .route("/api/disciplines", get(disciplines::list).post(disciplines::create))
        // Static segments before /:id so they are not parsed as ids
        .route("/api/disciplines/reorder", post(disciplines::reorder))
        .route("/api/disciplines/order", put(disciplines::bulk_order))
        .route(
            "/api/disciplines/:id",
            get(disciplines::get)
                .patch(disciplines::update)
                .delete(disciplines::delete),
        )
        .route("/api/disciplines/:id/summary", get(disciplines::summary))
}

fn evaluation_routes() -> Router<AppState> {
    use protected::evaluations;

    Router::new()
        .route("/api/evaluations", get(evaluations::list).post(evaluations::create))
        .route(
            "/api/evaluations/:id",
            axum::routing::patch(evaluations::update).delete(evaluations::delete),
        )
}

fn calendar_routes() -> Router<AppState> {
    use protected::calendar;

    Router::new()
        .route("/api/calendar/events", get(calendar::list).post(calendar::create))
        .route(
            "/api/calendar/events/:id",
            axum::routing::patch(calendar::update).delete(calendar::delete),
        )
        .route("/api/calendar/events/:id/sync", post(calendar::sync))
        .route("/api/calendar/external", get(calendar::external))
}

fn group_routes() -> Router<AppState> {
    use protected::groups;

    Router::new()
        .route("/api/groups", get(groups::list).post(groups::create))
        .route("/api/groups/join", post(groups::join))
        .route(
            "/api/groups/:id",
            get(groups::get).patch(groups::update).delete(groups::delete),
        )
        .route("/api/groups/:id/leave", post(groups::leave))
}

fn library_routes() -> Router<AppState> {
    use protected::library;

    Router::new()
        .route("/api/library", get(library::list).post(library::create))
        .route(
            "/api/library/:id",
            get(library::get).patch(library::update).delete(library::delete),
        )
}

fn notification_routes() -> Router<AppState> {
    use protected::notifications;

    Router::new()
        .route(
            "/api/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/email", post(notifications::send_email))
        .route(
            "/api/notifications/:id",
            axum::routing::delete(notifications::delete),
        )
        .route("/api/notifications/:id/read", post(notifications::mark_read))
}

fn push_routes() -> Router<AppState> {
    use protected::push;

    Router::new()
        .route(
            "/api/push/subscribe",
            post(push::subscribe).delete(push::unsubscribe),
        )
        .route("/api/push/send", post(push::send))
}

fn gamification_routes() -> Router<AppState> {
    use protected::gamification;

    Router::new()
        .route("/api/gamification/award", post(gamification::award))
        .route("/api/gamification/profile", get(gamification::profile))
        .route("/api/gamification/ledger", get(gamification::ledger))
}

fn ai_routes() -> Router<AppState> {
    use protected::ai;

    Router::new().route("/api/ai/complete", post(ai::complete))
}

/// Permissive when no origins are listed (or `*`), otherwise an allow-list
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
