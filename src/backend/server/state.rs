/**
 * Application State Management
 *
 * `AppState` is the axum router state: the service container, one
 * controller per namespace and the resolved configuration. Everything
 * inside is behind `Arc`, so cloning per request is cheap.
 *
 * The `FromRef` implementations let handlers extract only the part they
 * need, following axum's recommended pattern.
 */
use axum::extract::FromRef;
use std::sync::Arc;

use super::config::ServerConfig;
use crate::backend::namespaces::{Controllers, Services};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub controllers: Controllers,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(services: Services, config: ServerConfig) -> Self {
        Self {
            controllers: Controllers::new(&services),
            services,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Services {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.services.clone()
    }
}

impl FromRef<AppState> for Controllers {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.controllers.clone()
    }
}
