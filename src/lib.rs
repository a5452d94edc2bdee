//! xfboard - Realtime Board Backend
//!
//! Authorization and broadcast layer for a collaborative task-board
//! product. Authenticated clients connect over WebSockets to one of several
//! namespaces, join rooms for the boards, workspaces and chats they may
//! see, and receive every change made by other members in real time.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared with clients
//!   - Domain records (users, workspaces, boards, tasks, notifications)
//!   - Wire frames (`ClientFrame`, `ServerEvent`)
//!   - `RealtimeConfig`
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum WebSocket server and REST endpoints
//!   - Authentication, permissions, rate limiting
//!   - Room registry, broadcast router, namespace controllers
//!
//! # Feature Flags
//!
//! - **`ssr`** - Enables the backend modules (default)
//!
//! # Usage
//!
//! ```rust,no_run
//! use xfboard::backend::server::{create_app, load_config};
//!
//! # async fn example() {
//! let (app, tasks) = create_app(load_config()).await;
//! # let _ = (app, tasks);
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
