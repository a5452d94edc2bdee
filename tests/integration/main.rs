//! Integration tests
//!
//! Sessions driven end to end against the in-memory store, and the REST
//! surface through the router
#![cfg(feature = "ssr")]

#[allow(dead_code, unused_imports)]
#[path = "../common/mod.rs"]
mod common;

mod api;
mod realtime;
