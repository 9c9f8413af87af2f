//! 组订阅管理
//!
//! 连接在逻辑组中的成员关系：`status:<userId>` 承载状态订阅者，
//! `chat:<chatId>` 承载会话房间成员。成员关系纯内存、进程内，
//! 随连接生命周期存在，断线后由订阅调用重建。

use std::collections::HashSet;
use std::fmt;

use dashmap::DashMap;
use domain::{ChatId, ConnectionId, UserId};

/// 组键的两个命名空间。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Status(UserId),
    Chat(ChatId),
}

impl GroupKey {
    pub fn status(user_id: UserId) -> Self {
        Self::Status(user_id)
    }

    pub fn chat(chat_id: ChatId) -> Self {
        Self::Chat(chat_id)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Status(user_id) => write!(f, "status:{user_id}"),
            GroupKey::Chat(chat_id) => write!(f, "chat:{chat_id}"),
        }
    }
}

/// 进程内的组成员表。
///
/// 两个方向的索引都按键分片加锁，join/leave/iterate 可以并发执行。
#[derive(Debug, Default)]
pub struct GroupRegistry {
    members: DashMap<GroupKey, HashSet<ConnectionId>>,
    joined: DashMap<ConnectionId, HashSet<GroupKey>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 将连接加入组。重复加入是无操作。
    pub fn join(&self, connection_id: ConnectionId, key: GroupKey) {
        self.members
            .entry(key.clone())
            .or_default()
            .insert(connection_id);
        self.joined
            .entry(connection_id)
            .or_default()
            .insert(key);
    }

    /// 将连接移出组。未加入过同样是无操作。
    pub fn leave(&self, connection_id: ConnectionId, key: &GroupKey) {
        if let Some(mut set) = self.members.get_mut(key) {
            set.remove(&connection_id);
        }
        self.members.remove_if(key, |_, set| set.is_empty());
        if let Some(mut keys) = self.joined.get_mut(&connection_id) {
            keys.remove(key);
        }
        self.joined
            .remove_if(&connection_id, |_, keys| keys.is_empty());
    }

    /// 当前组内的连接集合。
    pub fn members_of(&self, key: &GroupKey) -> Vec<ConnectionId> {
        self.members
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 连接断开时清理其全部成员关系。
    pub fn leave_all(&self, connection_id: ConnectionId) {
        let Some((_, keys)) = self.joined.remove(&connection_id) else {
            return;
        };
        for key in keys {
            if let Some(mut set) = self.members.get_mut(&key) {
                set.remove(&connection_id);
            }
            self.members.remove_if(&key, |_, set| set.is_empty());
        }
    }
}
