// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Everything under /api/*. The router layers `jwt_auth_middleware` over these
// routes, so every handler can take `Extension<AuthUser>` and scope its
// queries to `user.id`.

pub mod ai;
pub mod auth;
pub mod calendar;
pub mod disciplines;
pub mod evaluations;
pub mod gamification;
pub mod groups;
pub mod library;
pub mod notifications;
pub mod push;
