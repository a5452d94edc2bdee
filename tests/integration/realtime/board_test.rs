//! Board namespace flows across several sockets

use pretty_assertions::assert_eq;
use serde_json::json;
use xfboard::backend::namespaces::Namespace;
use xfboard::backend::realtime::Room;
use xfboard::backend::store::DataStore;

use crate::common::{assert_single_error, find, names, Harness};

#[tokio::test]
async fn test_member_column_create_reaches_the_whole_room() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut member = h.board_client(&h.member).await;
    owner.drain();

    member
        .send(
            "column:create",
            json!({ "boardId": h.board.id, "columnData": { "name": "Doing" } }),
        )
        .await;

    for events in [owner.drain(), member.drain()] {
        assert_eq!(names(&events), vec!["column:created"]);
        let created = find(&events, "column:created");
        assert_eq!(created.data["column"]["name"], json!("Doing"));
        assert_eq!(created.data["user"]["id"], json!(h.member.id));
        assert!(created.data["timestamp"].is_string());
    }
    assert_eq!(h.store.list_columns(h.board.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_viewer_column_create_is_forbidden_without_side_effects() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut outsider = h.board_client(&h.outsider).await;
    owner.drain();
    let mutations = h.store.mutation_count();

    outsider
        .send(
            "column:create",
            json!({ "boardId": h.board.id, "columnData": { "name": "Sneaky" } }),
        )
        .await;

    assert_single_error(&outsider.drain(), "FORBIDDEN");
    assert!(owner.drain().is_empty());
    assert_eq!(h.store.mutation_count(), mutations);
}

#[tokio::test]
async fn test_column_with_tasks_cannot_be_deleted() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut member = h.board_client(&h.member).await;

    owner
        .send(
            "task:create",
            json!({ "boardId": h.board.id, "taskData": { "columnId": h.column.id, "title": "Ship it" } }),
        )
        .await;
    owner.drain();
    member.drain();

    owner.send("column:delete", json!({ "columnId": h.column.id })).await;

    assert_single_error(&owner.drain(), "CONFLICT");
    assert!(member.drain().is_empty());
    assert!(h.store.get_column(h.column.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_task_lifecycle_broadcasts_in_order() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut member = h.board_client(&h.member).await;
    owner.drain();

    member
        .send(
            "task:create",
            json!({ "boardId": h.board.id, "taskData": { "columnId": h.column.id, "title": "Draft" } }),
        )
        .await;
    let created = owner.drain();
    let task_id = find(&created, "task:created").data["task"]["id"].clone();

    member
        .send("task:update", json!({ "taskId": task_id, "updates": { "title": "Final" } }))
        .await;
    member
        .send(
            "task:move",
            json!({ "taskId": task_id, "toColumnId": h.column.id, "position": 0 }),
        )
        .await;
    owner.send("task:delete", json!({ "taskId": task_id })).await;

    assert_eq!(names(&owner.drain()), vec!["task:updated", "task:moved", "task:deleted"]);
    assert_eq!(
        names(&member.drain()),
        vec!["task:created", "task:updated", "task:moved", "task:deleted"]
    );
}

#[tokio::test]
async fn test_assignment_and_mentions_notify_connected_recipients() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut inbox = h.connect(Namespace::Notification, &h.member).await;

    owner
        .send(
            "task:create",
            json!({
                "boardId": h.board.id,
                "taskData": { "columnId": h.column.id, "title": "Review", "assigneeId": h.member.id }
            }),
        )
        .await;
    let task_id = find(&owner.drain(), "task:created").data["task"]["id"].clone();

    owner
        .send(
            "comment:add",
            json!({ "taskId": task_id, "content": "@milo look", "mentions": [h.member.id, h.member.id] }),
        )
        .await;

    let events = inbox.drain();
    let kinds: Vec<_> = events
        .iter()
        .filter(|e| e.event == "notification")
        .map(|e| e.data["type"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds, vec!["task_assigned", "mention"]);
    assert_eq!(h.store.notifications_for(h.member.id).await.len(), 2);
}

#[tokio::test]
async fn test_second_device_keeps_presence_until_last_disconnect() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut phone = h.board_client(&h.member).await;
    let mut laptop = h.board_client(&h.member).await;
    owner.drain();
    phone.drain();

    owner
        .send(
            "task:create",
            json!({ "boardId": h.board.id, "taskData": { "columnId": h.column.id, "title": "Sync" } }),
        )
        .await;
    assert_eq!(names(&phone.drain()), vec!["task:created"]);
    assert_eq!(names(&laptop.drain()), vec!["task:created"]);

    phone.disconnect().await;
    assert!(owner.drain().iter().all(|e| e.event != "board:user-left"));

    laptop.disconnect().await;
    let left = owner.drain();
    assert_eq!(names(&left), vec!["board:user-left"]);
    assert_eq!(left[0].data["user"]["id"], json!(h.member.id));

    // Closing twice changes nothing
    laptop.disconnect().await;
    assert!(owner.drain().is_empty());
    h.services.registry.verify_indices().unwrap();
}

#[tokio::test]
async fn test_explicit_leave_keeps_presence_while_another_device_stays() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut phone = h.board_client(&h.member).await;
    let mut laptop = h.board_client(&h.member).await;
    owner.drain();
    phone.drain();
    laptop.drain();
    let room = Room::board(h.board.id);

    phone.send("board:leave", json!({ "boardId": h.board.id })).await;
    assert_eq!(names(&phone.drain()), vec!["board:left"]);
    assert!(owner.drain().is_empty());
    assert!(h.services.registry.identities_in_room(&room).contains(&h.member.id));

    laptop.send("board:leave", json!({ "boardId": h.board.id })).await;
    assert_eq!(names(&laptop.drain()), vec!["board:left"]);
    let left = owner.drain();
    assert_eq!(names(&left), vec!["board:user-left"]);
    assert_eq!(left[0].data["user"]["id"], json!(h.member.id));
    assert!(!h.services.registry.identities_in_room(&room).contains(&h.member.id));
    h.services.registry.verify_indices().unwrap();
}

#[tokio::test]
async fn test_typing_skips_the_sender() {
    let h = Harness::new().await;
    let mut owner = h.board_client(&h.owner).await;
    let mut member = h.board_client(&h.member).await;
    owner.drain();

    member.send("typing:start", json!({ "boardId": h.board.id })).await;

    assert!(member.drain().is_empty());
    assert_eq!(names(&owner.drain()), vec!["typing:start"]);
}
