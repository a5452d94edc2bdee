//! REST notification endpoints

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use xfboard::backend::routes::create_router;
use xfboard::backend::server::{build_state, ServerConfig};
use xfboard::backend::store::{DataStore, InMemoryStore};
use xfboard::shared::{NotificationDraft, NotificationRecord, UserProfile};

use crate::common::{user, StaticTokens};

struct Api {
    router: Router,
    store: InMemoryStore,
    alice: UserProfile,
    bob: UserProfile,
    record: NotificationRecord,
}

async fn api() -> Api {
    let store = InMemoryStore::new();
    let alice = user("Alice", false);
    let bob = user("Bob", true);
    store.seed_user(alice.clone()).await;
    store.seed_user(bob.clone()).await;
    let record = store
        .create_notification(alice.id, &NotificationDraft::new("mention", Some(bob.id), json!({})))
        .await
        .unwrap();

    let state = build_state(ServerConfig::default(), Arc::new(store.clone()), Arc::new(StaticTokens));
    Api {
        router: create_router(state),
        store,
        alice,
        bob,
        record,
    }
}

fn request(method: Method, uri: &str, token: Option<&UserProfile>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.id));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let api = api().await;
    let response = api
        .router
        .oneshot(request(Method::GET, "/api/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], json!("ok"));
}

#[tokio::test]
async fn test_mark_read_requires_a_token() {
    let api = api().await;
    let uri = format!("/api/notifications/{}/read", api.record.id);
    let response = api.router.oneshot(request(Method::PATCH, &uri, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], json!("UNAUTHENTICATED"));
}

#[tokio::test]
async fn test_mark_read_by_owner() {
    let api = api().await;
    let uri = format!("/api/notifications/{}/read", api.record.id);
    let response = api
        .router
        .oneshot(request(Method::PATCH, &uri, Some(&api.alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["isRead"], json!(true));
    assert_eq!(api.store.count_unread(api.alice.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_query_token_is_percent_decoded() {
    let api = api().await;
    let encoded = api.alice.id.to_string().replace('-', "%2D");
    let uri = format!("/api/notifications/{}/read?token={}", api.record.id, encoded);
    let response = api.router.oneshot(request(Method::PATCH, &uri, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(api.store.count_unread(api.alice.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_other_users_records_are_not_found() {
    let api = api().await;
    let uri = format!("/api/notifications/{}", api.record.id);
    let response = api
        .router
        .oneshot(request(Method::DELETE, &uri, Some(&api.bob), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(api.store.get_notification(api.record.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_by_owner() {
    let api = api().await;
    let uri = format!("/api/notifications/{}", api.record.id);
    let response = api
        .router
        .oneshot(request(Method::DELETE, &uri, Some(&api.alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(api.store.notifications_for(api.alice.id).await.is_empty());
}

#[tokio::test]
async fn test_bulk_send_is_admin_only() {
    let api = api().await;
    let body = json!([{
        "recipientId": api.alice.id,
        "draft": { "type": "announcement", "payload": { "text": "release" } }
    }]);

    let refused = api
        .router
        .clone()
        .oneshot(request(Method::POST, "/api/notifications/bulk", Some(&api.alice), Some(body.clone())))
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let accepted = api
        .router
        .oneshot(request(Method::POST, "/api/notifications/bulk", Some(&api.bob), Some(body)))
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(json_body(accepted).await[0]["success"], json!(true));
    assert_eq!(api.store.notifications_for(api.alice.id).await.len(), 2);
}

#[tokio::test]
async fn test_unknown_route_is_a_structured_404() {
    let api = api().await;
    let response = api
        .router
        .oneshot(request(Method::GET, "/nowhere", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], json!("NOT_FOUND"));
}
