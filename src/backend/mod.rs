//! Backend Module
//!
//! Server-side code for xfboard: an axum server hosting the realtime
//! namespaces (board, workspace, system, notifications, chat) over
//! WebSockets, plus a small REST surface.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - WebSocket upgrade, REST endpoints, router assembly
//! - **`auth`** - `AuthGate` handshake authentication and JWT tokens
//! - **`permissions`** - Permission matrix and role resolution
//! - **`ratelimit`** - Sliding-window limiter with cooldown and sweeper
//! - **`realtime`** - Membership registry and broadcast router
//! - **`namespaces`** - Per-namespace controllers and the socket session
//! - **`store`** - `DataStore` boundary and the in-memory implementation
//! - **`middleware`** - REST authentication extractor
//! - **`error`** - `BackendError` and its conversions
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── auth/           - Handshake authentication
//! ├── permissions/    - Matrix and role resolver
//! ├── ratelimit/      - Rate limiting
//! ├── realtime/       - Registry and broadcast
//! ├── namespaces/     - Controllers and sessions
//! ├── store/          - Data store boundary
//! ├── middleware/     - Request middleware
//! └── error/          - Error types
//! ```
//!
//! # Event Flow
//!
//! ```text
//! frame → Session → RateLimiter → NamespaceController → Vec<Effect>
//!                                        │                   │
//!                          RoleResolver/PermissionMatrix   BroadcastRouter
//!                                        │                   │
//!                                    DataStore        MembershipRegistry → sockets
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use xfboard::backend::server::{create_app, load_config};
//!
//! # async fn example() {
//! let (app, tasks) = create_app(load_config()).await;
//! // Serve `app`, then `tasks.shutdown().await`
//! # }
//! ```

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Room membership and broadcasting
#[cfg(feature = "ssr")]
pub mod realtime;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Handshake authentication and tokens
#[cfg(feature = "ssr")]
pub mod auth;

/// Middleware for request processing
#[cfg(feature = "ssr")]
pub mod middleware;

/// Data store boundary
#[cfg(feature = "ssr")]
pub mod store;

/// Permission matrix and roles
#[cfg(feature = "ssr")]
pub mod permissions;

/// Rate limiting
#[cfg(feature = "ssr")]
pub mod ratelimit;

/// Namespace controllers
#[cfg(feature = "ssr")]
pub mod namespaces;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use error::BackendError;
#[cfg(feature = "ssr")]
pub use server::create_app;
