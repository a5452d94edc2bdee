/**
 * Error Conversion
 *
 * Conversions into and out of `BackendError`:
 *
 * - `IntoResponse` for the REST surface, rendering
 *   `{"error": <message>, "code": <code>, "status": <status>}`
 * - `ErrorPayload` for scoped socket `error` events
 * - `From<StoreError>` and `From<serde_json::Error>` so handlers can use `?`
 */
use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::error::types::BackendError;
use crate::backend::store::StoreError;
use crate::shared::{ErrorPayload, SharedError};

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("[Http] Request failed: {}", self);
        }
        let body = serde_json::json!({
            "error": self.message(),
            "code": self.code(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

impl BackendError {
    /// Render this error as the body of a scoped `error` event
    pub fn to_payload(&self, event: Option<&str>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.message(),
            event: event.map(str::to_string),
        }
    }
}

impl From<StoreError> for BackendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } => BackendError::not_found(entity),
            StoreError::Conflict { message } => BackendError::conflict(message),
            StoreError::Unavailable { message } => BackendError::internal(message),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Validation(SharedError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: BackendError = StoreError::not_found("Column", "c1").into();
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.message().contains("Column"));
    }

    #[test]
    fn test_store_unavailable_is_internal() {
        let err: BackendError = StoreError::Unavailable { message: "pool closed".into() }.into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_payload_carries_event_name() {
        let payload = BackendError::forbidden("denied").to_payload(Some("column:create"));
        assert_eq!(payload.code, "FORBIDDEN");
        assert_eq!(payload.event.as_deref(), Some("column:create"));
    }

    #[test]
    fn test_into_response_status() {
        let response = BackendError::not_found("Notification").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_from_serde_error_is_validation() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let backend: BackendError = err.into();
        assert_eq!(backend.code(), "VALIDATION_ERROR");
    }
}
