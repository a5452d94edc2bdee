/**
 * Backend Error Types
 *
 * The variants follow the realtime error taxonomy:
 *
 * - connection-fatal: `Unauthenticated`, `InvalidToken`, `UserNotFound`,
 *   `AuthTimeout` (and `RateLimited`/`Forbidden` when raised at connect time)
 * - event-scoped: `Forbidden`, `NotFound`, `Validation`, `RateLimited`,
 *   `Conflict`, `Deprecated`, `Internal`
 *
 * Each variant maps to a stable code that clients switch on.
 */
use crate::shared::SharedError;
use axum::http::StatusCode;
use thiserror::Error;

/// Backend-specific error types
#[derive(Debug, Error)]
pub enum BackendError {
    /// No token was presented
    #[error("Authentication required: {message}")]
    Unauthenticated { message: String },

    /// Token verification failed
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// Token was valid but its subject does not exist
    #[error("User {user_id} not found")]
    UserNotFound { user_id: String },

    /// Token verification did not finish within the connect timeout
    #[error("Authentication timed out after {millis}ms")]
    AuthTimeout { millis: u64 },

    /// The actor's role does not allow the operation
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// The target resource does not exist
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// Payload shape or value error, raised before any side effect
    #[error(transparent)]
    Validation(#[from] SharedError),

    /// The actor is inside a rate-limit cooldown
    #[error("Rate limit exceeded, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// A domain rule rejected the mutation
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The operation is no longer supported on this channel
    #[error("Deprecated: {message}")]
    Deprecated { message: String },

    /// Anything else
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BackendError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound { entity: entity.into() }
    }

    /// Create a validation error for a single payload field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(SharedError::validation(field, message))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn deprecated(message: impl Into<String>) -> Self {
        Self::Deprecated { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "UNAUTHENTICATED",
            Self::InvalidToken { .. } => "INVALID_TOKEN",
            Self::UserNotFound { .. } => "USER_NOT_FOUND",
            Self::AuthTimeout { .. } => "AUTH_TIMEOUT",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Conflict { .. } => "CONFLICT",
            Self::Deprecated { .. } => "DEPRECATED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. }
            | Self::InvalidToken { .. }
            | Self::UserNotFound { .. }
            | Self::AuthTimeout { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Deprecated { .. } => StatusCode::GONE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client
    ///
    /// Internal details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            Self::Internal { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error is one of the authentication failures
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. }
                | Self::InvalidToken { .. }
                | Self::UserNotFound { .. }
                | Self::AuthTimeout { .. }
        )
    }
}
