//! Middleware Module
//!
//! Request processing shared by the HTTP handlers.
//!
//! # Architecture
//!
//! - **`auth`** - `AuthUser` extractor backed by the `AuthGate`, and the
//!   header/query → `Handshake` conversion the socket upgrade reuses

pub mod auth;

pub use auth::{handshake_from_parts, query_from_uri, AuthUser};
