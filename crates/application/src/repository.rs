//! 持久化存储的抽象边界
//!
//! 投递核心只通过这些 trait 访问用户、会话和消息。

use async_trait::async_trait;
use domain::{Chat, ChatId, Message, RepositoryError, Timestamp, User, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;
    /// 用户已注册设备的推送 token，可能为空。
    async fn notification_tokens(&self, id: &UserId) -> Result<Vec<String>, RepositoryError>;
    async fn set_last_online(&self, id: &UserId, at: Timestamp) -> Result<(), RepositoryError>;
}

/// 创建会话的输入。id 由存储分配。
///
/// `direct_key` 只在规范两人/自聊会话上设置，存储以它保证
/// 同一无序用户对最多一个会话；群聊为 `None`。
#[derive(Debug, Clone)]
pub struct NewChat {
    pub name: String,
    pub photo_url: Option<String>,
    pub participants: Vec<UserId>,
    pub last_edited: Timestamp,
    pub direct_key: Option<String>,
}

/// 无序用户对的规范键。自聊退化为单个用户 id。
pub fn two_party_key(a: &UserId, b: &UserId) -> String {
    let (first, second) = if a.as_str() <= b.as_str() {
        (a, b)
    } else {
        (b, a)
    };
    if first == second {
        first.to_string()
    } else {
        format!("{first}:{second}")
    }
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn create(&self, chat: NewChat) -> Result<Chat, RepositoryError>;
    /// 返回参与者已填充的会话。
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError>;
    /// 参与者集合恰好为 {a, b} 的规范两人会话。
    async fn find_two_party(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Chat>, RepositoryError>;
    /// 退化的自聊会话：参与者只有该用户。
    async fn find_self_chat(&self, user_id: &UserId) -> Result<Option<Chat>, RepositoryError>;
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError>;
    async fn update_last_edited(&self, id: ChatId, at: Timestamp) -> Result<(), RepositoryError>;
    async fn add_participant(&self, id: ChatId, user_id: &UserId) -> Result<(), RepositoryError>;
    async fn remove_participant(
        &self,
        id: ChatId,
        user_id: &UserId,
    ) -> Result<(), RepositoryError>;
    async fn delete(&self, id: ChatId) -> Result<(), RepositoryError>;
}

/// 待持久化的消息。客户端提交的 id 在这里已被丢弃。
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub body: String,
    pub publish_date: Timestamp,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 持久化消息并返回分配了 id 的实体。
    async fn add(&self, message: NewMessage) -> Result<Message, RepositoryError>;
    /// 会话内发布时间最大的消息；并列时取存储定义的顺序。
    async fn latest_in_chat(&self, chat_id: ChatId) -> Result<Option<Message>, RepositoryError>;
}

/// 内存实现的存储（用于测试和开发）
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    use tokio::sync::RwLock;

    use super::*;
    use domain::MessageId;

    #[derive(Default)]
    pub struct InMemoryStore {
        users: RwLock<HashMap<UserId, User>>,
        tokens: RwLock<HashMap<UserId, Vec<String>>>,
        chats: RwLock<HashMap<ChatId, Chat>>,
        direct_keys: RwLock<HashMap<String, ChatId>>,
        messages: RwLock<Vec<Message>>,
        next_chat_id: AtomicI64,
        next_message_id: AtomicI64,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self {
                next_chat_id: AtomicI64::new(1),
                next_message_id: AtomicI64::new(1),
                ..Self::default()
            }
        }

        pub async fn insert_user(&self, user: User) {
            self.users.write().await.insert(user.id.clone(), user);
        }

        pub async fn register_token(&self, user_id: &UserId, token: impl Into<String>) {
            self.tokens
                .write()
                .await
                .entry(user_id.clone())
                .or_default()
                .push(token.into());
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryStore {
        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
            Ok(self.users.read().await.get(id).cloned())
        }

        async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
            let users = self.users.read().await;
            Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
        }

        async fn notification_tokens(
            &self,
            id: &UserId,
        ) -> Result<Vec<String>, RepositoryError> {
            Ok(self.tokens.read().await.get(id).cloned().unwrap_or_default())
        }

        async fn set_last_online(
            &self,
            id: &UserId,
            at: Timestamp,
        ) -> Result<(), RepositoryError> {
            let mut users = self.users.write().await;
            let user = users.get_mut(id).ok_or(RepositoryError::NotFound)?;
            user.last_online = Some(at);
            Ok(())
        }
    }

    #[async_trait]
    impl ChatRepository for InMemoryStore {
        async fn create(&self, chat: NewChat) -> Result<Chat, RepositoryError> {
            let users = self.users.read().await;
            let mut participants = Vec::with_capacity(chat.participants.len());
            for user_id in &chat.participants {
                let user = users.get(user_id).ok_or(RepositoryError::NotFound)?;
                participants.push(user.clone());
            }
            drop(users);

            // 规范键表在整个创建期间持写锁，并发创建同一键的一方得到 Conflict
            let mut direct_keys = self.direct_keys.write().await;
            if let Some(key) = &chat.direct_key {
                if direct_keys.contains_key(key) {
                    return Err(RepositoryError::Conflict);
                }
            }

            let id = ChatId::new(self.next_chat_id.fetch_add(1, Ordering::Relaxed));
            let stored = Chat {
                id,
                name: chat.name,
                last_edited: chat.last_edited,
                photo_url: chat.photo_url,
                participants,
            };
            self.chats.write().await.insert(id, stored.clone());
            if let Some(key) = chat.direct_key {
                direct_keys.insert(key, id);
            }
            Ok(stored)
        }

        async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
            Ok(self.chats.read().await.get(&id).cloned())
        }

        async fn find_two_party(
            &self,
            a: &UserId,
            b: &UserId,
        ) -> Result<Option<Chat>, RepositoryError> {
            let id = self.direct_keys.read().await.get(&two_party_key(a, b)).copied();
            match id {
                Some(id) => Ok(self.chats.read().await.get(&id).cloned()),
                None => Ok(None),
            }
        }

        async fn find_self_chat(
            &self,
            user_id: &UserId,
        ) -> Result<Option<Chat>, RepositoryError> {
            self.find_two_party(user_id, user_id).await
        }

        async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
            let chats = self.chats.read().await;
            Ok(chats
                .values()
                .filter(|chat| chat.has_participant(user_id))
                .cloned()
                .collect())
        }

        async fn update_last_edited(
            &self,
            id: ChatId,
            at: Timestamp,
        ) -> Result<(), RepositoryError> {
            let mut chats = self.chats.write().await;
            let chat = chats.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            chat.last_edited = at;
            Ok(())
        }

        async fn add_participant(
            &self,
            id: ChatId,
            user_id: &UserId,
        ) -> Result<(), RepositoryError> {
            let user = self
                .users
                .read()
                .await
                .get(user_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            let mut chats = self.chats.write().await;
            let chat = chats.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            if !chat.has_participant(user_id) {
                chat.participants.push(user);
            }
            Ok(())
        }

        async fn remove_participant(
            &self,
            id: ChatId,
            user_id: &UserId,
        ) -> Result<(), RepositoryError> {
            let mut chats = self.chats.write().await;
            let chat = chats.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            chat.participants.retain(|u| &u.id != user_id);
            Ok(())
        }

        async fn delete(&self, id: ChatId) -> Result<(), RepositoryError> {
            let removed = self.chats.write().await.remove(&id);
            if removed.is_none() {
                return Err(RepositoryError::NotFound);
            }
            self.direct_keys.write().await.retain(|_, chat_id| *chat_id != id);
            self.messages.write().await.retain(|m| m.chat_id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl MessageRepository for InMemoryStore {
        async fn add(&self, message: NewMessage) -> Result<Message, RepositoryError> {
            let id = MessageId::new(self.next_message_id.fetch_add(1, Ordering::Relaxed));
            let stored = Message {
                id,
                chat_id: message.chat_id,
                sender_id: message.sender_id,
                body: message.body,
                publish_date: message.publish_date,
            };
            self.messages.write().await.push(stored.clone());
            Ok(stored)
        }

        async fn latest_in_chat(
            &self,
            chat_id: ChatId,
        ) -> Result<Option<Message>, RepositoryError> {
            let messages = self.messages.read().await;
            Ok(messages
                .iter()
                .filter(|m| m.chat_id == chat_id)
                .max_by_key(|m| m.publish_date)
                .cloned())
        }
    }
}
