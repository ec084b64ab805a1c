use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope: `{"success": true, "data": ...}`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            status: StatusCode::OK,
        }
    }

    /// 201, for handlers that inserted a row or started an enrollment
    pub fn created(data: T) -> Self {
        Self {
            data,
            status: StatusCode::CREATED,
        }
    }

    fn envelope(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({ "success": true, "data": serde_json::to_value(&self.data)? }))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self.envelope() {
            Ok(body) => (self.status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                crate::error::ApiError::internal_server_error("Failed to serialize response data").into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn wraps_data_in_success_envelope() {
        let created = ApiResponse::created(json!({ "id": 7 }));
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.envelope().unwrap(), json!({ "success": true, "data": { "id": 7 } }));
    }

    #[test]
    fn unserializable_data_becomes_500() {
        // JSON object keys must be strings
        let mut bad = HashMap::new();
        bad.insert((1, 2), "x");
        let response = ApiResponse::success(bad).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
