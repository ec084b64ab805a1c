// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::database::manager::DatabaseError;
use crate::services::ServiceError;

pub type FieldErrors = BTreeMap<String, String>;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<FieldErrors>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error; detail is only exposed in development
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        self.to_json_with_detail(crate::is_development!())
    }

    fn to_json_with_detail(&self, expose_detail: bool) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        match self {
            ApiError::ValidationError { field_errors: Some(field_errors), .. } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::InternalServerError { detail: Some(detail), .. } if expose_detail => {
                response["detail"] = json!(detail);
            }
            _ => {}
        }

        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<FieldErrors>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure
    pub fn field(field: &str, problem: impl Into<String>) -> Self {
        let problem = problem.into();
        let mut field_errors = FieldErrors::new();
        field_errors.insert(field.to_string(), problem.clone());
        ApiError::validation_error(format!("{}: {}", field, problem), Some(field_errors))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: None,
        }
    }

    /// Generic 500 that carries the underlying error for development builds
    pub fn internal_with_detail(message: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Sqlx(sqlx::Error::RowNotFound) => ApiError::not_found("Record not found"),
            DatabaseError::Sqlx(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                ApiError::conflict("Record already exists")
            }
            DatabaseError::Sqlx(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                ApiError::bad_request("Referenced record does not exist")
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_with_detail("Database error occurred", sqlx_err)
            }
            DatabaseError::Migration(migrate_err) => {
                tracing::error!("Migration error: {}", migrate_err);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotConfigured(service) => {
                tracing::warn!("{} is not configured", service);
                ApiError::service_unavailable(format!("{} is not configured", service))
            }
            ServiceError::Upstream { service, status, message } => match status {
                400 | 422 => ApiError::bad_request(message),
                401 | 403 => ApiError::unauthorized(message),
                404 => ApiError::not_found(message),
                _ => {
                    tracing::error!("{} responded {}: {}", service, status, message);
                    ApiError::internal_with_detail(
                        format!("{} request failed", service),
                        format!("{} responded {}: {}", service, status, message),
                    )
                }
            },
            ServiceError::Http { service, source } => {
                tracing::error!("{} request error: {}", service, source);
                ApiError::internal_with_detail(format!("{} request failed", service), source)
            }
            ServiceError::Decode { service, message } => {
                tracing::error!("{} returned an unexpected payload: {}", service, message);
                ApiError::internal_with_detail(format!("{} request failed", service), message)
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_carries_field_errors() {
        let err = ApiError::field("name", "is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "name: is required");
        assert_eq!(body["field_errors"]["name"], "is required");
    }

    #[test]
    fn internal_detail_only_when_exposed() {
        let err = ApiError::internal_with_detail("Database error occurred", "relation does not exist");

        let hidden = err.to_json_with_detail(false);
        assert_eq!(hidden["error"], "Database error occurred");
        assert!(hidden.get("detail").is_none());

        let shown = err.to_json_with_detail(true);
        assert_eq!(shown["detail"], "relation does not exist");
    }

    #[test]
    fn upstream_statuses_map_to_client_errors() {
        let invalid = ApiError::from(ServiceError::Upstream {
            service: "auth",
            status: 422,
            message: "Invalid TOTP code entered".to_string(),
        });
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.message(), "Invalid TOTP code entered");

        let expired = ApiError::from(ServiceError::Upstream {
            service: "auth",
            status: 401,
            message: "JWT expired".to_string(),
        });
        assert_eq!(expired.status_code(), StatusCode::UNAUTHORIZED);

        let broken = ApiError::from(ServiceError::Upstream {
            service: "mail",
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(broken.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(broken.message(), "mail request failed");

        let missing = ApiError::from(ServiceError::NotConfigured("push gateway"));
        assert_eq!(missing.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn row_not_found_is_404() {
        let err = ApiError::from(DatabaseError::Sqlx(sqlx::Error::RowNotFound));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
