//! Backend Error Module
//!
//! This module defines the error taxonomy of the realtime backend. The same
//! error type flows out of socket handlers (where it becomes a scoped `error`
//! event) and REST handlers (where it becomes an HTTP response).
//!
//! # Architecture
//!
//! - **`types`** - `BackendError` and its wire codes
//! - **`conversion`** - `IntoResponse`, `From<StoreError>` and error payloads
//!
//! # Propagation
//!
//! Authentication failures and connect-time rate limiting terminate the
//! connection attempt. Every other kind is caught at the handler boundary
//! and delivered only to the socket that sent the offending event.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;
