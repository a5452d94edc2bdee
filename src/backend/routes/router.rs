/**
 * Router Configuration
 *
 * Combines the socket upgrade routes and the REST routes into one axum
 * router.
 *
 * # Route Order
 *
 * 1. WebSocket namespaces (`/ws`, `/ws/{namespace}`)
 * 2. API routes (`/api/...`)
 * 3. Fallback handler (404 as a structured error)
 */
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::backend::error::BackendError;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::socket::{ws_namespace, ws_root};
use crate::backend::server::state::AppState;

/// Create the axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Services, controllers and configuration
///
/// # Returns
///
/// Router ready to be served; handlers that want the peer address expect
/// `into_make_service_with_connect_info::<SocketAddr>()`
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new()
        .route("/ws", get(ws_root))
        .route("/ws/{namespace}", get(ws_namespace));

    let router = configure_api_routes(router);

    let router = router.fallback(|| async { BackendError::not_found("Route") });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
