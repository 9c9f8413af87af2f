//! 进程内实时通道
//!
//! 每个 WebSocket 连接注册一个无界发送端；连接、用户、组三个维度的
//! 投递都落到这些发送端上。接收端关闭的连接在投递时被惰性剪除。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use application::channel::{ChannelError, LiveChannel};
use application::groups::{GroupKey, GroupRegistry};
use domain::{ConnectionId, ServerEvent, UserId};

pub struct WsLiveChannel {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    by_user: DashMap<UserId, HashSet<ConnectionId>>,
    groups: Arc<GroupRegistry>,
}

impl WsLiveChannel {
    pub fn new(groups: Arc<GroupRegistry>) -> Self {
        Self {
            connections: DashMap::new(),
            by_user: DashMap::new(),
            groups,
        }
    }

    /// 注册一条连接，返回写循环消费的事件接收端。
    pub fn register(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(connection_id, tx);
        self.by_user
            .entry(user_id.clone())
            .or_default()
            .insert(connection_id);
        rx
    }

    /// 注销连接。重复注销是无操作。
    pub fn unregister(&self, user_id: &UserId, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
        if let Some(mut set) = self.by_user.get_mut(user_id) {
            set.remove(&connection_id);
        }
        self.by_user.remove_if(user_id, |_, set| set.is_empty());
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn push(&self, connection_id: ConnectionId, event: ServerEvent) {
        let Some(sender) = self.connections.get(&connection_id) else {
            return;
        };
        if sender.send(event).is_err() {
            // 写循环已经退出，剪掉死连接
            drop(sender);
            self.connections.remove(&connection_id);
            debug!(%connection_id, "pruned dead connection");
        }
    }
}

#[async_trait]
impl LiveChannel for WsLiveChannel {
    async fn send_to_connection(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), ChannelError> {
        self.push(connection_id, event);
        Ok(())
    }

    async fn send_to_user(
        &self,
        user_id: &UserId,
        event: ServerEvent,
    ) -> Result<(), ChannelError> {
        let targets: Vec<ConnectionId> = self
            .by_user
            .get(user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for connection_id in targets {
            self.push(connection_id, event.clone());
        }
        Ok(())
    }

    async fn send_to_group(
        &self,
        key: &GroupKey,
        event: ServerEvent,
    ) -> Result<(), ChannelError> {
        for connection_id in self.groups.members_of(key) {
            self.push(connection_id, event.clone());
        }
        Ok(())
    }
}
