//! Room Controller error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Validation messages are returned to clients verbatim; storage and
//! internal failures are logged server-side and replaced with a generic
//! message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Room Controller error type.
///
/// Maps to HTTP status codes:
/// - `Validation`: 400 Bad Request
/// - `NotFound`: 404 Not Found
/// - `UpgradeRequired`: 426 Upgrade Required
/// - `Storage`, `Internal`: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RoomError {
    /// Client supplied an invalid operation payload.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested resource or route does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// WebSocket endpoint hit without an upgrade handshake.
    #[error("WebSocket upgrade required")]
    UpgradeRequired,

    /// Durable store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error (mailbox or response channel failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// Returns the HTTP status code for this error (for metrics recording).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            RoomError::Validation(_) => 400,
            RoomError::NotFound(_) => 404,
            RoomError::UpgradeRequired => 426,
            RoomError::Storage(_) | RoomError::Internal(_) => 500,
        }
    }
}

/// Flat error body: `{"error": "..."}`.
///
/// This is the shape clients match on for validation failures, so it is
/// kept flat rather than nesting a code/message pair.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RoomError::Validation(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            RoomError::NotFound(resource) => (StatusCode::NOT_FOUND, resource.clone()),
            RoomError::UpgradeRequired => (
                StatusCode::UPGRADE_REQUIRED,
                "WebSocket upgrade required".to_string(),
            ),
            RoomError::Storage(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "rc.storage", error = %err, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            RoomError::Internal(err) => {
                tracing::error!(target: "rc.errors", error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", RoomError::Validation("content is required".to_string())),
            "Validation error: content is required"
        );
        assert_eq!(
            format!("{}", RoomError::NotFound("no such route".to_string())),
            "Not found: no such route"
        );
        assert_eq!(
            format!("{}", RoomError::UpgradeRequired),
            "WebSocket upgrade required"
        );
        assert_eq!(
            format!("{}", RoomError::Storage("timeout".to_string())),
            "Storage error: timeout"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RoomError::Validation("x".to_string()).status_code(), 400);
        assert_eq!(RoomError::NotFound("x".to_string()).status_code(), 404);
        assert_eq!(RoomError::UpgradeRequired.status_code(), 426);
        assert_eq!(RoomError::Storage("x".to_string()).status_code(), 500);
        assert_eq!(RoomError::Internal("x".to_string()).status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_validation() {
        let error = RoomError::Validation("content is required".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "content is required");
    }

    #[tokio::test]
    async fn test_into_response_upgrade_required() {
        let error = RoomError::UpgradeRequired;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
    }

    #[tokio::test]
    async fn test_into_response_storage_hides_details() {
        let error = RoomError::Storage("connection refused at 192.168.1.100:6379".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Internal detail must not leak to the client
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let error = RoomError::NotFound("unknown path".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "unknown path");
    }
}
