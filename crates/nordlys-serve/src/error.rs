//! API error types and response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type that converts to the appropriate HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request parameters (malformed feed URI, unknown feed, bad
    /// time bucket).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Database failure while serving the request.
    #[error("database error: {0}")]
    Database(#[from] nordlys_store::StoreError),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone())),
            Self::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    Some("A database error occurred".to_string()),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let response = ApiError::BadRequest("invalid feed URI".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_error_maps_to_500() {
        let err = ApiError::Database(nordlys_store::StoreError::Timeout(
            std::time::Duration::from_secs(30),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
