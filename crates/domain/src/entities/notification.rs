use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 推送目标平台。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Android,
    Ios,
    Web,
}

/// 应用内通知，经实时通道投递给在线用户。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub sender: UserId,
    pub title: String,
    pub body: String,
}

/// 推送地址：显式的设备 token 列表，或由提供方管理的主题键。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushTarget {
    Tokens(Vec<String>),
    Topic(String),
}

/// 交给推送提供方的通知意图。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub target: PushTarget,
    /// 发送者标识，随数据负载带给客户端用于去重自己的消息。
    pub sender: String,
    pub title: String,
    pub body: String,
    pub platform: Platform,
}

impl PushNotification {
    pub fn to_tokens(
        tokens: Vec<String>,
        sender: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            target: PushTarget::Tokens(tokens),
            sender: sender.into(),
            title: title.into(),
            body: body.into(),
            platform: Platform::Android,
        }
    }

    pub fn to_topic(
        topic: impl Into<String>,
        sender: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            target: PushTarget::Topic(topic.into()),
            sender: sender.into(),
            title: title.into(),
            body: body.into(),
            platform: Platform::Android,
        }
    }
}
