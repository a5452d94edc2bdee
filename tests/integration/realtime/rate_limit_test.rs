//! Per-identity rate limiting with cooldown

use serde_json::json;
use std::time::Duration;
use xfboard::backend::namespaces::Namespace;

use crate::common::{assert_single_error, names, Harness};

#[tokio::test]
async fn test_cooldown_outlasts_a_fresh_window() {
    let h = Harness::new().await;
    let mut member = h.connect(Namespace::Board, &h.member).await;
    let join = json!({ "boardId": h.board.id });

    for _ in 0..100 {
        member.send("board:join", join.clone()).await;
    }
    assert!(member.drain().iter().all(|e| e.event != "error"));

    member.send("board:join", join.clone()).await;
    assert_single_error(&member.drain(), "RATE_LIMITED");

    // A new window has begun but the cooldown has not ended
    h.clock.advance(Duration::from_secs(61));
    member.send("board:join", join.clone()).await;
    assert_single_error(&member.drain(), "RATE_LIMITED");

    h.clock.advance(Duration::from_secs(240));
    member.send("board:join", join).await;
    assert_eq!(names(&member.drain()), vec!["board:state"]);
}

#[tokio::test]
async fn test_budget_is_shared_across_sockets_of_one_identity() {
    let h = Harness::new().await;
    let mut first = h.connect(Namespace::Board, &h.member).await;
    let mut second = h.connect(Namespace::Chat, &h.member).await;
    let mut owner = h.connect(Namespace::Board, &h.owner).await;
    let join = json!({ "boardId": h.board.id });

    for _ in 0..100 {
        first.send("board:join", join.clone()).await;
    }
    second.send("chat:join", join.clone()).await;
    assert_single_error(&second.drain(), "RATE_LIMITED");

    owner.send("board:join", join).await;
    assert_eq!(names(&owner.drain()), vec!["board:state"]);
}

#[tokio::test]
async fn test_runtime_update_tightens_the_general_budget() {
    let h = Harness::new().await;
    let mut admin = h.connect(Namespace::System, &h.admin).await;
    admin
        .send(
            "system:update-config",
            json!({ "configKey": "rateLimit.maxEvents", "configValue": 2 }),
        )
        .await;
    assert_eq!(names(&admin.drain()), vec!["system:config-updated"]);

    let mut member = h.connect(Namespace::Board, &h.member).await;
    let join = json!({ "boardId": h.board.id });
    member.send("board:join", join.clone()).await;
    member.send("board:join", join.clone()).await;
    member.drain();
    member.send("board:join", join).await;
    assert_single_error(&member.drain(), "RATE_LIMITED");
}
