use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, MessageId, Timestamp, UserId};

/// 已持久化的消息。在投递核心的范围内不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub body: String,
    pub publish_date: Timestamp,
}
