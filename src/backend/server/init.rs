/**
 * Server Initialization
 *
 * Wires the data store, token service and realtime services into an
 * `AppState`, builds the router and starts the background tasks.
 *
 * # Initialization Process
 *
 * 1. Create the data store (in-memory) and token service (JWT)
 * 2. Optionally seed demo records
 * 3. Build `Services` and the per-namespace controllers
 * 4. Start the rate-limit sweepers
 * 5. Create the router
 */
use axum::Router;
use std::sync::Arc;
use uuid::Uuid;

use super::config::ServerConfig;
use super::state::AppState;
use crate::backend::auth::{JwtTokenService, TokenService};
use crate::backend::namespaces::Services;
use crate::backend::ratelimit::{spawn_sweeper, SweeperHandle};
use crate::backend::routes::create_router;
use crate::backend::store::{DataStore, InMemoryStore};
use crate::shared::{Board, MembershipRecord, UserProfile, Workspace};

/// Long-running tasks owned by the server
pub struct BackgroundTasks {
    sweepers: Vec<SweeperHandle>,
}

impl BackgroundTasks {
    /// Start one idle-state sweeper per rate limiter
    pub fn start(services: &Services) -> Self {
        let interval = services.config.rate_limit_sweep_interval();
        Self {
            sweepers: vec![
                spawn_sweeper(services.limiter.clone(), interval),
                spawn_sweeper(services.system_limiter.clone(), interval),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.sweepers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sweepers.is_empty()
    }

    /// Stop every task and wait for it to finish
    pub async fn shutdown(self) {
        for sweeper in self.sweepers {
            let name = sweeper.name();
            sweeper.shutdown().await;
            tracing::debug!("[Server] Sweeper {} stopped", name);
        }
        tracing::info!("[Server] Background tasks stopped");
    }
}

/// Build the application state around a store and token service
pub fn build_state(
    config: ServerConfig,
    store: Arc<dyn DataStore>,
    tokens: Arc<dyn TokenService>,
) -> AppState {
    let services = Services::builder(store, tokens)
        .config(config.realtime.clone())
        .build();
    AppState::new(services, config)
}

/// Create the router and start the background tasks
///
/// # Returns
///
/// The router, ready for `axum::serve`, and the tasks to shut down on exit
pub async fn create_app(config: ServerConfig) -> (Router<()>, BackgroundTasks) {
    tracing::info!("[Server] Initializing realtime backend");

    let tokens = Arc::new(match &config.jwt_secret {
        Some(secret) => JwtTokenService::new(secret),
        None => JwtTokenService::from_env(),
    });
    let store = InMemoryStore::new();
    if config.seed_demo {
        seed_demo(&store, &tokens).await;
    }

    let state = build_state(config, Arc::new(store), tokens);
    let tasks = BackgroundTasks::start(&state.services);
    tracing::info!("[Server] {} background tasks started", tasks.len());

    (create_router(state), tasks)
}

/// Seed one user owning one workspace and board, and log a token for it
async fn seed_demo(store: &InMemoryStore, tokens: &JwtTokenService) {
    let user = UserProfile {
        id: Uuid::new_v4(),
        username: "demo".into(),
        display_name: "Demo User".into(),
        avatar_url: None,
        is_admin: true,
    };
    let workspace = Workspace {
        id: Uuid::new_v4(),
        name: "Demo Workspace".into(),
        owner_id: user.id,
        settings: serde_json::json!({}),
        limits: Default::default(),
        usage: Default::default(),
    };
    let board = Board {
        id: Uuid::new_v4(),
        workspace_id: workspace.id,
        name: "Demo Board".into(),
        owner_id: user.id,
        column_order: Vec::new(),
    };

    store.seed_user(user.clone()).await;
    store.seed_workspace(workspace.clone()).await;
    store
        .seed_workspace_member(MembershipRecord {
            user_id: user.id,
            resource_id: workspace.id,
            can_admin: true,
            can_edit: true,
            can_view: true,
        })
        .await;
    store.seed_board(board.clone()).await;

    match tokens.create_token(user.id, None, Some(user.username.clone())) {
        Ok(token) => tracing::info!(
            "[Server] Demo workspace {} / board {}; token: {}",
            workspace.id,
            board.id,
            token
        ),
        Err(e) => tracing::warn!("[Server] Failed to mint demo token: {}", e),
    }
}
