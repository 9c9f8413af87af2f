use async_trait::async_trait;
use domain::PushNotification;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("push dispatch failed: {0}")]
    Failed(String),
}

impl DispatchError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 推送网关的抽象。
///
/// 投递是尽力而为的：失败由调用方记录上报，不在核心内重试。
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: PushNotification) -> Result<(), DispatchError>;
}
