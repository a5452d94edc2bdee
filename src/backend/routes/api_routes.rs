/**
 * API Route Handlers
 *
 * REST endpoints that sit next to the socket namespaces:
 *
 * - `GET /api/health` - liveness and registry sizes (public)
 * - `PATCH /api/notifications/{id}/read` - mark one notification read
 * - `DELETE /api/notifications/{id}` - delete one notification
 * - `POST /api/notifications/bulk` - bulk send (global admins only)
 *
 * Both per-record endpoints reuse `send_notification` with a disposition,
 * so every device of the owner sees the change and a fresh unread count.
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::namespaces::Services;
use crate::backend::realtime::{BulkNotification, BulkOutcome};
use crate::backend::server::state::AppState;
use crate::shared::{NotificationDisposition, NotificationDraft, NotificationRecord};

/// Add the REST routes to `router`
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/health", get(health))
        .route("/api/notifications/bulk", post(send_bulk))
        .route("/api/notifications/{id}/read", patch(mark_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}

async fn health(State(services): State<Services>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptimeSecs": services.runtime.uptime_secs(),
        "registry": services.registry.stats(),
    }))
}

/// Load a record and check it belongs to the caller
async fn owned_record(services: &Services, user_id: Uuid, id: Uuid) -> Result<NotificationRecord, BackendError> {
    services
        .store
        .get_notification(id)
        .await?
        .filter(|record| record.recipient_id == user_id)
        .ok_or_else(|| BackendError::not_found("Notification"))
}

async fn mark_read(
    State(services): State<Services>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationRecord>, BackendError> {
    let user_id = identity.user.id;
    let record = owned_record(&services, user_id, id).await?;
    let draft = NotificationDraft::existing(&record).with_disposition(NotificationDisposition::MarkRead);
    let updated = services.router.send_notification(user_id, draft).await?;
    tracing::info!("[Http] Notification {} marked read by {}", id, user_id);
    Ok(Json(updated))
}

async fn delete_notification(
    State(services): State<Services>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, BackendError> {
    let user_id = identity.user.id;
    let record = owned_record(&services, user_id, id).await?;
    let draft = NotificationDraft::existing(&record).with_disposition(NotificationDisposition::Delete);
    services.router.send_notification(user_id, draft).await?;
    tracing::info!("[Http] Notification {} deleted by {}", id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn send_bulk(
    State(services): State<Services>,
    AuthUser(identity): AuthUser,
    Json(items): Json<Vec<BulkNotification>>,
) -> Result<Json<Vec<BulkOutcome>>, BackendError> {
    if !identity.user.is_admin {
        return Err(BackendError::forbidden("Bulk notifications require a global admin"));
    }
    let count = items.len();
    let outcomes = services.router.send_bulk_notifications(items).await;
    let failed = outcomes.iter().filter(|o| !o.success).count();
    tracing::info!("[Http] Bulk send by {}: {} entries, {} failed", identity.user.id, count, failed);
    Ok(Json(outcomes))
}
