//! Connection admission

use assert_matches::assert_matches;
use std::collections::HashMap;
use uuid::Uuid;
use xfboard::backend::auth::Handshake;
use xfboard::backend::error::BackendError;
use xfboard::backend::namespaces::Namespace;
use xfboard::shared::UserProfile;

use crate::common::{names, Harness};

#[tokio::test]
async fn test_handshake_without_token_is_refused() {
    let h = Harness::new().await;
    let result = h.try_connect(Namespace::Board, Handshake::default()).await;
    assert_matches!(result.err(), Some(BackendError::Unauthenticated { .. }));
    assert_eq!(h.services.registry.stats().sockets, 0);
}

#[tokio::test]
async fn test_invalid_and_unknown_tokens_are_refused() {
    let h = Harness::new().await;
    let garbage = h.try_connect(Namespace::Board, Handshake::with_token("garbage")).await;
    assert_matches!(garbage.err(), Some(BackendError::InvalidToken { .. }));

    let stranger = Handshake::with_token(Uuid::new_v4().to_string());
    let unknown = h.try_connect(Namespace::Board, stranger).await;
    assert_matches!(unknown.err(), Some(BackendError::UserNotFound { .. }));
}

#[tokio::test]
async fn test_query_token_is_accepted_and_welcomed() {
    let h = Harness::new().await;
    let handshake = Handshake {
        query: HashMap::from([("token".to_string(), h.member.id.to_string())]),
        ..Handshake::default()
    };
    let Ok(mut client) = h.try_connect(Namespace::Board, handshake).await else {
        panic!("query token refused");
    };
    let events = client.drain();
    assert_eq!(names(&events), vec!["welcome"]);
    assert_eq!(events[0].data["user"]["id"], serde_json::json!(h.member.id));
    assert_eq!(client.session.context().user_id(), h.member.id);
}

#[tokio::test]
async fn test_malformed_frame_reports_to_sender_only() {
    let h = Harness::new().await;
    let mut member = h.board_client(&h.member).await;
    let mut owner = h.board_client(&h.owner).await;
    member.drain();

    member.session.handle_text("{not json").await;
    member.send("board:unknown", serde_json::json!({})).await;

    let events = member.drain();
    assert_eq!(names(&events), vec!["error", "error"]);
    assert_eq!(events[0].error_code(), Some("VALIDATION_ERROR"));
    assert_eq!(events[1].error_code(), Some("VALIDATION_ERROR"));
    assert!(owner.drain().is_empty());
}

#[tokio::test]
async fn test_every_namespace_accepts_a_regular_user_except_system() {
    let h = Harness::new().await;
    let member: &UserProfile = &h.member;
    for namespace in [
        Namespace::Root,
        Namespace::Board,
        Namespace::Workspace,
        Namespace::Notification,
        Namespace::Chat,
    ] {
        let handshake = Handshake::with_token(member.id.to_string());
        assert!(h.try_connect(namespace, handshake).await.is_ok(), "{} refused", namespace);
    }
    let system = h
        .try_connect(Namespace::System, Handshake::with_token(member.id.to_string()))
        .await;
    assert_matches!(system.err(), Some(BackendError::Forbidden { .. }));
}
