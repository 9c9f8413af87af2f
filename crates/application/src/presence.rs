//! 在线状态追踪
//!
//! 每用户一个活跃会话计数，检测 0→1 / 1→0 的边沿转换。
//! 只有边沿才广播状态：同一用户第二台设备连接时重复广播
//! 会污染订阅方的"最后在线"展示，属于正确性问题。

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use domain::{ChatId, ServerEvent, UserId, UserStatus, OWN_STATUS_SCOPE};

use crate::channel::LiveChannel;
use crate::clock::Clock;
use crate::error::ApplicationResult;
use crate::groups::GroupKey;
use crate::repository::UserRepository;

/// 在线会话计数器。
#[async_trait]
pub trait PresenceTracker: Send + Sync {
    /// 记录一个新会话。返回是否为 0→1 转换。
    async fn connect(&self, user_id: &UserId) -> ApplicationResult<bool>;

    /// 记录一个会话结束。返回是否为 1→0 转换。
    ///
    /// 计数下限为 0：重复或乱序的断开信号被容忍，不算错误。
    async fn disconnect(&self, user_id: &UserId) -> ApplicationResult<bool>;

    async fn is_online(&self, user_id: &UserId) -> ApplicationResult<bool>;
}

/// 进程内的会话计数实现。
///
/// 计数通过 DashMap 的 entry API 修改，同一用户的更新被分片锁
/// 串行化；不同用户的连接互不阻塞。`last_online` 在每次有效断开
/// 时写回存储。
pub struct LocalPresenceTracker {
    sessions: DashMap<UserId, u32>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl LocalPresenceTracker {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            users,
            clock,
        }
    }

    /// 当前会话数，仅用于诊断。
    pub fn session_count(&self, user_id: &UserId) -> u32 {
        self.sessions.get(user_id).map(|c| *c).unwrap_or(0)
    }

    /// 表中仍有条目的用户数，仅用于诊断。
    pub fn tracked_users(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl PresenceTracker for LocalPresenceTracker {
    async fn connect(&self, user_id: &UserId) -> ApplicationResult<bool> {
        let first = {
            let mut count = self.sessions.entry(user_id.clone()).or_insert(0);
            *count += 1;
            *count == 1
        };
        tracing::debug!(%user_id, first_session = first, "session connected");
        Ok(first)
    }

    async fn disconnect(&self, user_id: &UserId) -> ApplicationResult<bool> {
        let last = {
            match self.sessions.get_mut(user_id) {
                Some(mut count) if *count > 0 => {
                    *count -= 1;
                    *count == 0
                }
                _ => {
                    // 无条目：断开信号重复或乱序，容忍之
                    tracing::debug!(%user_id, "disconnect with no live session ignored");
                    return Ok(false);
                }
            }
        };
        // 归零的条目从表中移除，计数器不随历史用户增长
        self.sessions.remove_if(user_id, |_, count| *count == 0);
        if let Err(err) = self.users.set_last_online(user_id, self.clock.now()).await {
            tracing::warn!(error = %err, %user_id, "failed to stamp last_online");
        }
        tracing::debug!(%user_id, last_session = last, "session disconnected");
        Ok(last)
    }

    async fn is_online(&self, user_id: &UserId) -> ApplicationResult<bool> {
        Ok(self.sessions.get(user_id).map(|c| *c > 0).unwrap_or(false))
    }
}

/// 在计数器之上叠加状态广播的门面。
///
/// 连接生命周期钩子在这里把边沿转换变成发给状态订阅组的
/// `UpdateUserStatus` 事件；非边沿的连接和断开不产生广播。
pub struct PresenceService {
    tracker: Arc<dyn PresenceTracker>,
    channel: Arc<dyn LiveChannel>,
    clock: Arc<dyn Clock>,
}

impl PresenceService {
    pub fn new(
        tracker: Arc<dyn PresenceTracker>,
        channel: Arc<dyn LiveChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tracker,
            channel,
            clock,
        }
    }

    pub fn tracker(&self) -> &Arc<dyn PresenceTracker> {
        &self.tracker
    }

    pub async fn handle_connect(&self, user_id: &UserId) -> ApplicationResult<()> {
        if self.tracker.connect(user_id).await? {
            self.broadcast_status(user_id, UserStatus::online(self.clock.now()))
                .await;
            tracing::info!(%user_id, "user came online");
        }
        Ok(())
    }

    pub async fn handle_disconnect(&self, user_id: &UserId) -> ApplicationResult<()> {
        if self.tracker.disconnect(user_id).await? {
            self.broadcast_status(user_id, UserStatus::offline(self.clock.now()))
                .await;
            tracing::info!(%user_id, "user went offline");
        }
        Ok(())
    }

    /// 用户主动上报的状态，转发给自己的状态订阅者。
    pub async fn set_own_status(&self, user_id: &UserId, status: UserStatus) {
        self.broadcast_status(user_id, status).await;
    }

    /// 输入状态发到会话房间，作用域带上会话 id。
    pub async fn set_typing_status(&self, user_id: &UserId, chat_id: ChatId, status: UserStatus) {
        let event = ServerEvent::UpdateUserStatus {
            scope: chat_id.to_string(),
            user_id: user_id.clone(),
            status,
        };
        if let Err(err) = self
            .channel
            .send_to_group(&GroupKey::chat(chat_id), event)
            .await
        {
            tracing::warn!(error = %err, %user_id, %chat_id, "failed to relay typing status");
        }
    }

    async fn broadcast_status(&self, user_id: &UserId, status: UserStatus) {
        let event = ServerEvent::UpdateUserStatus {
            scope: OWN_STATUS_SCOPE.to_owned(),
            user_id: user_id.clone(),
            status,
        };
        if let Err(err) = self
            .channel
            .send_to_group(&GroupKey::status(user_id.clone()), event)
            .await
        {
            tracing::warn!(error = %err, %user_id, "failed to broadcast user status");
        }
    }
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod presence_tests;
