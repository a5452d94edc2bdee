//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - A token service that accepts a user id as the token
//! - A seeded harness around `Services` and the namespace controllers
//! - Socket clients driven through real `Session`s
//! - Custom assertion helpers

pub mod assertions;
pub mod harness;

// Re-export commonly used utilities
pub use assertions::*;
pub use harness::*;
