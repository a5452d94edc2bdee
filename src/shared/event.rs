/**
 * Socket Event Envelopes
 *
 * Every frame on a namespace socket is a JSON object of the shape
 * `{"event": <name>, "data": <payload>}`. Clients send `ClientFrame`s, the
 * server answers with `ServerEvent`s which additionally carry the time they
 * were produced.
 */
use serde::{Deserialize, Serialize};

/// Name of the event used for scoped handler errors
pub const ERROR_EVENT: &str = "error";

/// Name of the event sent before a refused connection is closed
pub const CONNECT_ERROR_EVENT: &str = "connect_error";

/// Inbound frame received from a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientFrame {
    /// Event name, e.g. `column:create`
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ClientFrame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Outbound event delivered to one or more sockets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerEvent {
    /// Event name, e.g. `column:created`
    pub event: String,
    /// Event payload (JSON-serializable data)
    pub data: serde_json::Value,
    /// Timestamp when the event was produced (RFC3339)
    pub timestamp: String,
}

/// Structured body of an `error` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    /// Stable machine-readable code, e.g. `FORBIDDEN`
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Inbound event that caused the error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl ServerEvent {
    /// Create a new server event stamped with the current time
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
            timestamp: get_timestamp(),
        }
    }

    /// Create a scoped `error` event
    pub fn error(payload: ErrorPayload) -> Self {
        let data = serde_json::to_value(&payload).unwrap_or_else(|_| {
            serde_json::json!({ "code": payload.code, "message": payload.message })
        });
        Self::new(ERROR_EVENT, data)
    }

    /// Create the `connect_error` event sent before a refusal
    pub fn connect_error(code: &str, message: &str) -> Self {
        Self::new(
            CONNECT_ERROR_EVENT,
            serde_json::json!({ "code": code, "message": message }),
        )
    }

    /// Whether this is a scoped error event
    pub fn is_error(&self) -> bool {
        self.event == ERROR_EVENT
    }

    /// Error code carried by an `error`/`connect_error` event
    pub fn error_code(&self) -> Option<&str> {
        self.data.get("code").and_then(|c| c.as_str())
    }
}

/// Get the current timestamp as an RFC3339 string
pub fn get_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
