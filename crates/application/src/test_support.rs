//! 测试替身：记录型通道和推送网关、固定时钟。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::TimeZone;
use domain::{ConnectionId, PushNotification, ServerEvent, Timestamp, User, UserId};

use crate::channel::{ChannelError, LiveChannel};
use crate::clock::Clock;
use crate::groups::GroupKey;
use crate::notifier::{DispatchError, NotificationDispatcher};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Sent {
    Connection(ConnectionId, ServerEvent),
    User(UserId, ServerEvent),
    Group(GroupKey, ServerEvent),
}

#[derive(Default)]
pub(crate) struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn group_events(&self, key: &GroupKey) -> Vec<ServerEvent> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Group(k, event) if &k == key => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn user_events(&self, user_id: &UserId) -> Vec<ServerEvent> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::User(u, event) if &u == user_id => Some(event),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LiveChannel for RecordingChannel {
    async fn send_to_connection(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Connection(connection_id, event));
        Ok(())
    }

    async fn send_to_user(
        &self,
        user_id: &UserId,
        event: ServerEvent,
    ) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::User(user_id.clone(), event));
        Ok(())
    }

    async fn send_to_group(
        &self,
        key: &GroupKey,
        event: ServerEvent,
    ) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Group(key.clone(), event));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    sent: Mutex<Vec<PushNotification>>,
    fail: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let dispatcher = Self::default();
        dispatcher.fail.store(true, Ordering::Relaxed);
        dispatcher
    }

    pub fn dispatched(&self) -> Vec<PushNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: PushNotification) -> Result<(), DispatchError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(DispatchError::failed("provider unavailable"));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub(crate) struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

pub(crate) fn ts(secs: i64) -> Timestamp {
    chrono::Utc.timestamp_opt(secs, 0).unwrap()
}

pub(crate) fn user(id: &str, first: &str, last: &str) -> User {
    User {
        id: UserId::from(id),
        user_name: first.to_lowercase(),
        first_name: first.to_owned(),
        last_name: last.to_owned(),
        photo_url: Some(format!("https://cdn.example/{id}.jpg")),
        last_online: None,
    }
}
