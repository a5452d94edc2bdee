//! Route Configuration Module
//!
//! HTTP surface of the backend: the WebSocket upgrade for every namespace
//! and a handful of REST endpoints.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! ├── socket.rs       - WebSocket upgrade and frame pump
//! └── api_routes.rs   - REST endpoint handlers
//! ```
//!
//! # Route Types
//!
//! ## WebSocket
//!
//! - `GET /ws` - default namespace
//! - `GET /ws/{namespace}` - `board`, `workspace`, `system`, `notifications`, `chat`
//!
//! The token is read from the `Authorization` header, or the `token` query
//! parameter for browser clients.
//!
//! ## API Routes
//!
//! - `GET /api/health` - Liveness
//! - `PATCH /api/notifications/{id}/read` - Mark read
//! - `DELETE /api/notifications/{id}` - Delete
//! - `POST /api/notifications/bulk` - Bulk send

/// Main router creation
pub mod router;

/// WebSocket transport
pub mod socket;

/// API endpoint handlers
pub mod api_routes;

pub use router::create_router;
