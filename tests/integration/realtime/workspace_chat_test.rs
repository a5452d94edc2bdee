//! Workspace presence and board chat

use pretty_assertions::assert_eq;
use serde_json::json;
use xfboard::backend::namespaces::Namespace;
use xfboard::shared::UserProfile;

use crate::common::{assert_single_error, find, names, Client, Harness};

async fn workspace_client(h: &Harness, user: &UserProfile) -> Client {
    let mut client = h.connect(Namespace::Workspace, user).await;
    client.send("workspace:join", json!({ "workspaceId": h.workspace.id })).await;
    client
}

#[tokio::test]
async fn test_workspace_presence_and_role_change() {
    let h = Harness::new().await;
    let mut owner = workspace_client(&h, &h.owner).await;
    let joined = owner.drain();
    assert_eq!(find(&joined, "workspace:joined").data["role"], json!("owner"));

    let mut member = workspace_client(&h, &h.member).await;
    assert_eq!(find(&member.drain(), "workspace:joined").data["role"], json!("member"));
    assert_eq!(names(&owner.drain()), vec!["workspace:member-online"]);

    owner
        .send(
            "workspace:member-update",
            json!({
                "workspaceId": h.workspace.id,
                "memberId": h.member.id,
                "permissions": { "canEdit": true, "canView": true }
            }),
        )
        .await;
    assert_eq!(names(&member.drain()), vec!["workspace:member-updated"]);
    assert_eq!(names(&owner.drain()), vec!["workspace:member-updated"]);

    member
        .send(
            "workspace:settings-update",
            json!({ "workspaceId": h.workspace.id, "settings": { "theme": "dark" } }),
        )
        .await;
    assert_eq!(names(&member.drain()), vec!["workspace:settings-updated"]);

    member.disconnect().await;
    assert_eq!(names(&owner.drain()), vec!["workspace:settings-updated", "workspace:member-offline"]);
}

#[tokio::test]
async fn test_outsider_cannot_change_settings() {
    let h = Harness::new().await;
    let mut outsider = workspace_client(&h, &h.outsider).await;
    outsider.drain();
    outsider
        .send(
            "workspace:settings-update",
            json!({ "workspaceId": h.workspace.id, "settings": { "theme": "dark" } }),
        )
        .await;
    assert_single_error(&outsider.drain(), "FORBIDDEN");
}

#[tokio::test]
async fn test_chat_requires_joining_and_membership() {
    let h = Harness::new().await;
    let mut owner = h.connect(Namespace::Chat, &h.owner).await;
    let mut member = h.connect(Namespace::Chat, &h.member).await;
    let mut outsider = h.connect(Namespace::Chat, &h.outsider).await;
    let room = json!({ "boardId": h.board.id });
    let message = json!({ "boardId": h.board.id, "content": "hi all" });

    member.send("chat:message", message.clone()).await;
    assert_single_error(&member.drain(), "FORBIDDEN");

    for client in [&mut owner, &mut member, &mut outsider] {
        client.send("chat:join", room.clone()).await;
    }
    owner.drain();
    member.drain();
    outsider.drain();

    member.send("chat:message", message.clone()).await;
    for client in [&mut owner, &mut member, &mut outsider] {
        let events = client.drain();
        assert_eq!(names(&events), vec!["chat:message"]);
        assert_eq!(events[0].data["message"]["content"], json!("hi all"));
    }

    // Viewers can read the room but not post to it
    outsider.send("chat:message", message).await;
    assert_single_error(&outsider.drain(), "FORBIDDEN");
    assert!(member.drain().is_empty());
}
