//! 实时通道上的事件
//!
//! 事件以 `{"event": "...", "data": {...}}` 的 JSON 帧下发。

use serde::{Deserialize, Serialize};

use crate::entities::{Chat, InAppNotification, Message, UserStatus};
use crate::value_objects::UserId;

/// 用户自身状态广播使用的作用域键，区别于具体的会话键。
pub const OWN_STATUS_SCOPE: &str = "-1";

/// 服务器经实时通道下发给客户端的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// 新消息到达
    MessageReceived(Message),
    /// 用户状态变化（上线、下线、输入中）
    UpdateUserStatus {
        scope: String,
        user_id: UserId,
        status: UserStatus,
    },
    /// 会话被解析或创建
    ChatCreated(Chat),
    /// 应用内通知
    NotificationReceived(InAppNotification),
}
