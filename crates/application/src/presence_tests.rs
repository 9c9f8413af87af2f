//! 在线状态追踪的单元测试：计数不变量和边沿触发广播。

use std::sync::Arc;

use domain::{ChatId, ServerEvent, UserId, UserStatus};

use super::*;
use crate::repository::memory::InMemoryStore;
use crate::test_support::{ts, user, FixedClock, RecordingChannel};

async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_user(user("u1", "Uma", "Udell")).await;
    store
}

fn service(
    store: Arc<InMemoryStore>,
    channel: Arc<RecordingChannel>,
) -> (PresenceService, Arc<LocalPresenceTracker>) {
    let clock = Arc::new(FixedClock(ts(1_000)));
    let tracker = Arc::new(LocalPresenceTracker::new(store, clock.clone()));
    let service = PresenceService::new(tracker.clone(), channel, clock);
    (service, tracker)
}

fn status_of(event: &ServerEvent) -> &str {
    match event {
        ServerEvent::UpdateUserStatus { status, .. } => &status.status,
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn two_devices_one_online_one_offline_broadcast() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, tracker) = service(store, channel.clone());
    let uid = UserId::from("u1");
    let status_group = GroupKey::status(uid.clone());

    // D1、D2 两台设备连接
    service.handle_connect(&uid).await.unwrap();
    service.handle_connect(&uid).await.unwrap();
    assert_eq!(tracker.session_count(&uid), 2);

    let events = channel.group_events(&status_group);
    assert_eq!(events.len(), 1);
    assert_eq!(status_of(&events[0]), "Online");

    // D1 断开：不是边沿，无广播
    service.handle_disconnect(&uid).await.unwrap();
    assert_eq!(tracker.session_count(&uid), 1);
    assert_eq!(channel.group_events(&status_group).len(), 1);

    // D2 断开：1→0 边沿，一次 Offline
    service.handle_disconnect(&uid).await.unwrap();
    assert_eq!(tracker.session_count(&uid), 0);
    let events = channel.group_events(&status_group);
    assert_eq!(events.len(), 2);
    assert_eq!(status_of(&events[1]), "Offline");
}

#[tokio::test]
async fn duplicate_disconnect_is_tolerated() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, tracker) = service(store, channel.clone());
    let uid = UserId::from("u1");

    service.handle_connect(&uid).await.unwrap();
    service.handle_disconnect(&uid).await.unwrap();
    // 重复的断开信号：计数保持 0，无第二次 Offline 广播
    service.handle_disconnect(&uid).await.unwrap();

    assert_eq!(tracker.session_count(&uid), 0);
    let events = channel.group_events(&GroupKey::status(uid));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn reconnect_rearms_the_online_edge() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, _) = service(store, channel.clone());
    let uid = UserId::from("u1");
    let status_group = GroupKey::status(uid.clone());

    service.handle_connect(&uid).await.unwrap();
    service.handle_disconnect(&uid).await.unwrap();
    service.handle_connect(&uid).await.unwrap();

    let statuses: Vec<_> = channel
        .group_events(&status_group)
        .iter()
        .map(|e| status_of(e).to_owned())
        .collect();
    assert_eq!(statuses, ["Online", "Offline", "Online"]);
}

#[tokio::test]
async fn offline_users_leave_no_counter_entry() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, tracker) = service(store, channel.clone());
    let uid = UserId::from("u1");

    service.handle_connect(&uid).await.unwrap();
    assert_eq!(tracker.tracked_users(), 1);

    // 最后一次断开后条目被移除，而不是留一个 0 计数
    service.handle_disconnect(&uid).await.unwrap();
    assert_eq!(tracker.tracked_users(), 0);

    // 移除后重连依然是 0→1 边沿
    service.handle_connect(&uid).await.unwrap();
    assert_eq!(tracker.tracked_users(), 1);
    let statuses: Vec<_> = channel
        .group_events(&GroupKey::status(uid))
        .iter()
        .map(|e| status_of(e).to_owned())
        .collect();
    assert_eq!(statuses, ["Online", "Offline", "Online"]);
}

#[tokio::test]
async fn is_online_follows_session_count() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, tracker) = service(store, channel);
    let uid = UserId::from("u1");

    assert!(!tracker.is_online(&uid).await.unwrap());
    service.handle_connect(&uid).await.unwrap();
    assert!(tracker.is_online(&uid).await.unwrap());
    service.handle_disconnect(&uid).await.unwrap();
    assert!(!tracker.is_online(&uid).await.unwrap());
}

#[tokio::test]
async fn disconnect_stamps_last_online() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, _) = service(store.clone(), channel);
    let uid = UserId::from("u1");

    service.handle_connect(&uid).await.unwrap();
    service.handle_disconnect(&uid).await.unwrap();

    let stored = crate::repository::UserRepository::find_by_id(store.as_ref(), &uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_online, Some(ts(1_000)));
}

#[tokio::test]
async fn concurrent_connects_broadcast_once() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, tracker) = service(store, channel.clone());
    let service = Arc::new(service);
    let uid = UserId::from("u1");

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            let uid = uid.clone();
            tokio::spawn(async move { service.handle_connect(&uid).await.unwrap() })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(tracker.session_count(&uid), 16);
    assert_eq!(channel.group_events(&GroupKey::status(uid)).len(), 1);
}

#[tokio::test]
async fn typing_status_targets_the_chat_group() {
    let store = seeded_store().await;
    let channel = Arc::new(RecordingChannel::new());
    let (service, _) = service(store, channel.clone());
    let uid = UserId::from("u1");
    let chat_id = ChatId::new(9);

    let typing = UserStatus {
        status: "Typing".to_owned(),
        last_online: None,
    };
    service.set_typing_status(&uid, chat_id, typing).await;

    let events = channel.group_events(&GroupKey::chat(chat_id));
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::UpdateUserStatus { scope, user_id, status } => {
            assert_eq!(scope, "9");
            assert_eq!(user_id, &uid);
            assert_eq!(status.status, "Typing");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
