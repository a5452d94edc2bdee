//! Server Module
//!
//! Initialization and configuration of the axum server that hosts the
//! realtime namespaces.
//!
//! # Architecture
//!
//! - **`state`** - `AppState` and its `FromRef` implementations
//! - **`config`** - Environment and TOML configuration loading
//! - **`init`** - State construction, app creation, background tasks
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - ServerConfig loading
//! └── init.rs         - App creation and BackgroundTasks
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `load_config()` after `dotenv`
//! 2. **State Creation**: store, token service, `Services`, controllers
//! 3. **Background Tasks**: rate-limit sweepers
//! 4. **Router Creation**: WebSocket namespaces and REST endpoints

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::{load_config, ServerConfig};
pub use init::{build_state, create_app, BackgroundTasks};
pub use state::AppState;
