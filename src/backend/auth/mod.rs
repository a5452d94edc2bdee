//! Authentication Module
//!
//! Every socket connection passes through the [`AuthGate`] before any
//! namespace handler runs. The gate pulls a bearer token out of the
//! handshake, verifies it through a [`TokenService`] under a connect-time
//! timeout, resolves the user record and produces the [`Identity`] that is
//! attached to the connection for its whole lifetime.
//!
//! # Architecture
//!
//! - **`sessions`** - `TokenService` trait and the HS256 `JwtTokenService`
//! - **`gate`** - `Handshake`, `Identity` and `AuthGate`
//!
//! # Authentication Flow
//!
//! 1. Token taken from the auth payload, else from the `token` query parameter
//! 2. Missing token → `Unauthenticated`
//! 3. Verification failure → `InvalidToken`
//! 4. Verified subject with no user record → `UserNotFound`
//! 5. Slow verification → `AuthTimeout`
//!
//! Any failure terminates the connection attempt; clients reconnect with a
//! fresh token.

/// Token verification and issuance
pub mod sessions;

/// Per-connection authentication gate
pub mod gate;

pub use gate::{AuthGate, Handshake, Identity};
pub use sessions::{Claims, JwtTokenService, TokenError, TokenService, VerifiedToken};
