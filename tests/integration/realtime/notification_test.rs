//! Notification delivery across devices and namespaces

use pretty_assertions::assert_eq;
use serde_json::json;
use xfboard::backend::auth::Handshake;
use xfboard::backend::namespaces::Namespace;
use xfboard::backend::realtime::BulkNotification;
use xfboard::backend::store::DataStore;
use xfboard::shared::{NotificationDisposition, NotificationDraft};

use crate::common::{assert_single_error, find, names, Harness};

fn draft(kind: &str) -> NotificationDraft {
    NotificationDraft::new(kind, None, json!({ "text": "hello" }))
}

#[tokio::test]
async fn test_connect_reports_unread_count() {
    let h = Harness::new().await;
    h.store.create_notification(h.member.id, &draft("mention")).await.unwrap();

    let handshake = Handshake::with_token(h.member.id.to_string());
    let Ok(mut client) = h.try_connect(Namespace::Notification, handshake).await else {
        panic!("member refused");
    };
    let events = client.drain();
    assert_eq!(names(&events), vec!["welcome", "notifications:unreadCount"]);
    assert_eq!(events[1].data["count"], json!(1));
}

#[tokio::test]
async fn test_resending_an_existing_record_does_not_duplicate() {
    let h = Harness::new().await;
    let mut inbox = h.connect(Namespace::Notification, &h.member).await;
    let record = h.store.create_notification(h.member.id, &draft("mention")).await.unwrap();

    for _ in 0..2 {
        h.services
            .router
            .send_notification(h.member.id, NotificationDraft::existing(&record))
            .await
            .unwrap();
        let events = inbox.drain();
        assert_eq!(names(&events), vec!["notification", "notifications:unreadCount"]);
        assert_eq!(events[0].data["id"], json!(record.id));
        assert_eq!(events[1].data["count"], json!(1));
    }
    assert_eq!(h.store.notifications_for(h.member.id).await.len(), 1);
}

#[tokio::test]
async fn test_every_device_receives_a_notification_once() {
    let h = Harness::new().await;
    let mut phone = h.connect(Namespace::Notification, &h.member).await;
    let mut laptop = h.connect(Namespace::Notification, &h.member).await;
    phone.send("notifications:subscribe", json!({ "types": ["mention"] })).await;
    phone.drain();

    h.services.router.send_notification(h.member.id, draft("mention")).await.unwrap();

    // The phone is in both the personal and the type room but hears it once
    for device in [&mut phone, &mut laptop] {
        assert_eq!(names(&device.drain()), vec!["notification", "notifications:unreadCount"]);
    }
}

#[tokio::test]
async fn test_dispositions_update_the_unread_count() {
    let h = Harness::new().await;
    let mut inbox = h.connect(Namespace::Notification, &h.member).await;
    let first = h.services.router.send_notification(h.member.id, draft("mention")).await.unwrap();
    let second = h.services.router.send_notification(h.member.id, draft("mention")).await.unwrap();
    inbox.drain();

    let read = NotificationDraft::existing(&first).with_disposition(NotificationDisposition::MarkRead);
    let updated = h.services.router.send_notification(h.member.id, read).await.unwrap();
    assert!(updated.is_read);

    let delete = NotificationDraft::existing(&second).with_disposition(NotificationDisposition::Delete);
    h.services.router.send_notification(h.member.id, delete).await.unwrap();

    let events = inbox.drain();
    assert_eq!(
        names(&events),
        vec![
            "notification",
            "notifications:unreadCount",
            "notification:deleted",
            "notifications:unreadCount",
        ]
    );
    assert_eq!(events[1].data["count"], json!(1));
    assert_eq!(events[3].data["count"], json!(0));
    assert!(h.store.get_notification(second.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bulk_send_isolates_failures() {
    let h = Harness::new().await;
    let mut inbox = h.connect(Namespace::Notification, &h.member).await;
    h.store.set_recipient_unavailable(h.outsider.id).await;

    let outcomes = h
        .services
        .router
        .send_bulk_notifications(vec![
            BulkNotification { recipient_id: h.owner.id, draft: draft("announcement") },
            BulkNotification { recipient_id: h.outsider.id, draft: draft("announcement") },
            BulkNotification { recipient_id: h.member.id, draft: draft("announcement") },
        ])
        .await;

    let successes: Vec<_> = outcomes.iter().map(|o| o.success).collect();
    assert_eq!(successes, vec![true, false, true]);
    assert!(outcomes[1].error.is_some());
    assert_eq!(names(&inbox.drain()), vec!["notification", "notifications:unreadCount"]);
}

#[tokio::test]
async fn test_recent_and_deprecated_events() {
    let h = Harness::new().await;
    let mut inbox = h.connect(Namespace::Notification, &h.member).await;
    for _ in 0..3 {
        h.services.router.send_notification(h.member.id, draft("mention")).await.unwrap();
    }
    inbox.drain();

    inbox.send("notifications:getRecent", json!({ "limit": 2 })).await;
    let events = inbox.drain();
    let recent = find(&events, "notifications:recent");
    assert_eq!(recent.data["notifications"].as_array().map(Vec::len), Some(2));

    inbox.send("notifications:markAsRead", json!({ "notificationId": recent.data["notifications"][0]["id"] })).await;
    assert_single_error(&inbox.drain(), "DEPRECATED");
    assert_eq!(h.store.count_unread(h.member.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_delivery_receipt_requires_ownership() {
    let h = Harness::new().await;
    let mut inbox = h.connect(Namespace::Notification, &h.member).await;
    let mut other = h.connect(Namespace::Notification, &h.owner).await;
    let record = h.services.router.send_notification(h.member.id, draft("mention")).await.unwrap();
    inbox.drain();

    let payload = json!({ "notificationId": record.id, "deliveryMethod": "websocket" });
    other.send("notifications:delivered", payload.clone()).await;
    assert_single_error(&other.drain(), "NOT_FOUND");

    inbox.send("notifications:delivered", payload).await;
    assert_eq!(names(&inbox.drain()), vec!["notifications:delivery-confirmed"]);
    assert_eq!(h.store.receipts().await.len(), 1);
}
