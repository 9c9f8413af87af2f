use async_trait::async_trait;
use domain::{ConnectionId, ServerEvent, UserId};
use thiserror::Error;

use crate::groups::GroupKey;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel send failed: {0}")]
    SendFailed(String),
}

impl ChannelError {
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed(message.into())
    }
}

/// 已建立的实时通道的抽象。
///
/// 向已打开连接的扇出是非阻塞尽力而为的：目标连接已经死亡时
/// 跳过即可，不构成操作失败。
#[async_trait]
pub trait LiveChannel: Send + Sync {
    async fn send_to_connection(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), ChannelError>;

    /// 扇出到某个用户所有打开的连接。
    async fn send_to_user(&self, user_id: &UserId, event: ServerEvent)
        -> Result<(), ChannelError>;

    async fn send_to_group(&self, key: &GroupKey, event: ServerEvent)
        -> Result<(), ChannelError>;
}
