//! Realtime integration tests
//!
//! Every test connects real sessions and observes what each socket receives

mod auth_test;
mod board_test;
mod notification_test;
mod rate_limit_test;
mod system_test;
mod workspace_chat_test;
