//! 会话实体与按观察者计算的展示身份
//!
//! 两人会话没有固定的名字：同一个会话对两个参与者渲染出不同的
//! 名字和头像。展示字段在读取时由纯函数计算，从不持久化。

use serde::{Deserialize, Serialize};

use crate::entities::message::Message;
use crate::entities::user::User;
use crate::value_objects::{ChatId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    /// 存储的名字，仅对多于两人的会话是权威的。
    pub name: String,
    pub last_edited: Timestamp,
    pub photo_url: Option<String>,
    /// 参与者集合，唯一用户，至少一人。
    pub participants: Vec<User>,
}

/// 某个观察者看到的会话展示字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDisplay {
    pub name: String,
    pub photo_url: Option<String>,
}

impl Chat {
    /// 退化的自聊会话：参与者只有自己。
    pub fn is_self_chat(&self) -> bool {
        self.participants.len() == 1
    }

    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|u| &u.id == user_id)
    }

    /// 计算 `viewer` 视角下的展示名字和头像。
    ///
    /// 两人以内的会话展示对方的名字；自聊或找不到对方时退回
    /// 观察者自己的名字。群聊使用存储的名字。
    pub fn display_for(&self, viewer: &UserId) -> ChatDisplay {
        if self.participants.len() > 2 {
            return self.stored_display();
        }

        let other = self.participants.iter().find(|u| &u.id != viewer);
        match other.or_else(|| self.participants.first()) {
            Some(user) => ChatDisplay {
                name: user.display_name(),
                photo_url: user.photo_url.clone(),
            },
            None => self.stored_display(),
        }
    }

    /// 计算以 `sender` 本人署名的展示字段。
    ///
    /// 群发推送的标题用发送者的名字：订阅方看到的是"谁发来了消息"，
    /// 与 [`Chat::display_for`] 的取向相反。
    pub fn display_from(&self, sender: &UserId) -> ChatDisplay {
        if self.participants.len() > 2 {
            return self.stored_display();
        }

        let own = self.participants.iter().find(|u| &u.id == sender);
        match own.or_else(|| self.participants.first()) {
            Some(user) => ChatDisplay {
                name: user.display_name(),
                photo_url: user.photo_url.clone(),
            },
            None => self.stored_display(),
        }
    }

    fn stored_display(&self) -> ChatDisplay {
        ChatDisplay {
            name: self.name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

/// 会话列表条目：展示字段已按观察者解析，附带最新一条消息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,
    pub name: String,
    pub photo_url: Option<String>,
    pub last_edited: Timestamp,
    pub participants: Vec<User>,
    pub preview: Option<Message>,
}

impl ChatSummary {
    pub fn resolve(chat: Chat, viewer: &UserId, preview: Option<Message>) -> Self {
        let display = chat.display_for(viewer);
        Self {
            id: chat.id,
            name: display.name,
            photo_url: display.photo_url,
            last_edited: chat.last_edited,
            participants: chat.participants,
            preview,
        }
    }
}
