//! Property-based tests
#![cfg(feature = "ssr")]

#[allow(dead_code, unused_imports)]
#[path = "../common/mod.rs"]
mod common;

mod limiter_proptest;
mod permission_proptest;
mod registry_proptest;
