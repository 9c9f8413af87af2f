//! 领域错误定义
//!
//! 所有失败都以单次操作为边界，不存在进程级致命错误。

use thiserror::Error;

use crate::value_objects::{ChatId, UserId};

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 入站负载无法解析或缺少必要字段，拒绝且无副作用
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// 引用的会话不存在，拒绝且不产生部分持久化
    #[error("chat {0} not found")]
    ChatNotFound(ChatId),

    /// 引用的用户不存在
    #[error("user {0} not found")]
    UserNotFound(UserId),
}

impl DomainError {
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }
}

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,
    #[error("entity already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;
