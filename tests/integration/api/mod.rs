//! API integration tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`

mod notification_routes_test;
