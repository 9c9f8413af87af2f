//! 会话解析
//!
//! 两人会话的规范化获取或创建、按观察者解析的展示字段、
//! 会话列表的预览消息选取，以及群聊的成员管理。

use std::sync::Arc;

use tracing::{debug, info, warn};

use domain::{
    Chat, ChatId, ChatSummary, DomainError, Message, RepositoryError, ServerEvent, User, UserId,
};

use crate::channel::LiveChannel;
use crate::clock::Clock;
use crate::error::ApplicationResult;
use crate::repository::{
    two_party_key, ChatRepository, MessageRepository, NewChat, UserRepository,
};

pub struct ChatResolverDependencies {
    pub users: Arc<dyn UserRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub channel: Arc<dyn LiveChannel>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatResolver {
    users: Arc<dyn UserRepository>,
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    channel: Arc<dyn LiveChannel>,
    clock: Arc<dyn Clock>,
}

impl ChatResolver {
    pub fn new(deps: ChatResolverDependencies) -> Self {
        Self {
            users: deps.users,
            chats: deps.chats,
            messages: deps.messages,
            channel: deps.channel,
            clock: deps.clock,
        }
    }

    /// 获取或创建两个用户之间的规范会话。
    ///
    /// 同一无序用户对只存在一个会话；发起方等于目标时解析退化的
    /// 自聊会话。解析完成后（无论新建与否）给双方的实时通道发
    /// `ChatCreated`——客户端按 id 去重，重复下发是安全的。
    pub async fn get_or_create_two_party_chat(
        &self,
        initiator_id: &UserId,
        target_id: &UserId,
    ) -> ApplicationResult<Chat> {
        let chat = match self.find_canonical(initiator_id, target_id).await? {
            Some(chat) => {
                debug!(chat_id = %chat.id, "resolved existing two-party chat");
                chat
            }
            None => {
                let target = self.require_user(target_id).await?;
                if initiator_id != target_id {
                    self.require_user(initiator_id).await?;
                }
                let participants = if initiator_id == target_id {
                    vec![initiator_id.clone()]
                } else {
                    vec![initiator_id.clone(), target_id.clone()]
                };
                let created = self
                    .chats
                    .create(NewChat {
                        name: target.user_name.clone(),
                        photo_url: None,
                        participants,
                        last_edited: self.clock.now(),
                        direct_key: Some(two_party_key(initiator_id, target_id)),
                    })
                    .await;
                match created {
                    Ok(chat) => {
                        info!(chat_id = %chat.id, %initiator_id, %target_id, "created two-party chat");
                        chat
                    }
                    // 并发解析撞上规范键：另一侧已创建，取其结果
                    Err(RepositoryError::Conflict) => self
                        .find_canonical(initiator_id, target_id)
                        .await?
                        .ok_or(RepositoryError::Conflict)?,
                    Err(err) => return Err(err.into()),
                }
            }
        };

        self.announce(&chat, initiator_id).await;
        if initiator_id != target_id {
            self.announce(&chat, target_id).await;
        }

        Ok(chat)
    }

    /// 观察者视角下的单个会话，附带预览消息。
    pub async fn get_chat(
        &self,
        viewer_id: &UserId,
        chat_id: ChatId,
    ) -> ApplicationResult<ChatSummary> {
        let chat = self
            .chats
            .find_by_id(chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound(chat_id))?;
        let preview = self.messages.latest_in_chat(chat_id).await?;
        Ok(ChatSummary::resolve(chat, viewer_id, preview))
    }

    /// 会话的预览消息：发布时间最大的一条。
    pub async fn preview_message(&self, chat_id: ChatId) -> ApplicationResult<Option<Message>> {
        Ok(self.messages.latest_in_chat(chat_id).await?)
    }

    /// 用户的会话列表，按 last_edited 降序。
    ///
    /// 刚解析、还没有消息的两人会话不进入列表（自聊除外），
    /// 直到第一条消息出现。
    pub async fn list_user_chats(
        &self,
        viewer_id: &UserId,
    ) -> ApplicationResult<Vec<ChatSummary>> {
        let mut chats = self.chats.list_for_user(viewer_id).await?;
        chats.sort_by(|a, b| b.last_edited.cmp(&a.last_edited));

        let mut summaries = Vec::with_capacity(chats.len());
        for chat in chats {
            let preview = self.messages.latest_in_chat(chat.id).await?;
            let hidden =
                preview.is_none() && chat.participants.len() <= 2 && !chat.is_self_chat();
            if hidden {
                continue;
            }
            summaries.push(ChatSummary::resolve(chat, viewer_id, preview));
        }
        Ok(summaries)
    }

    /// 显式创建群聊，所有成员（含创建者）都收到 `ChatCreated`。
    pub async fn create_group_chat(
        &self,
        creator_id: &UserId,
        name: String,
        member_ids: &[UserId],
    ) -> ApplicationResult<Chat> {
        let mut participants = vec![creator_id.clone()];
        for member in member_ids {
            if !participants.contains(member) {
                participants.push(member.clone());
            }
        }
        for user_id in &participants {
            self.require_user(user_id).await?;
        }

        let chat = self
            .chats
            .create(NewChat {
                name,
                photo_url: None,
                participants: participants.clone(),
                last_edited: self.clock.now(),
                direct_key: None,
            })
            .await?;
        info!(chat_id = %chat.id, members = participants.len(), "created group chat");

        for user_id in &participants {
            self.announce(&chat, user_id).await;
        }
        Ok(chat)
    }

    pub async fn add_user_to_chat(
        &self,
        chat_id: ChatId,
        user_id: &UserId,
    ) -> ApplicationResult<()> {
        self.require_chat(chat_id).await?;
        self.require_user(user_id).await?;
        self.chats.add_participant(chat_id, user_id).await?;
        Ok(())
    }

    pub async fn remove_user_from_chat(
        &self,
        chat_id: ChatId,
        user_id: &UserId,
    ) -> ApplicationResult<()> {
        self.require_chat(chat_id).await?;
        self.require_user(user_id).await?;
        self.chats.remove_participant(chat_id, user_id).await?;
        Ok(())
    }

    pub async fn delete_chat(&self, chat_id: ChatId) -> ApplicationResult<()> {
        self.require_chat(chat_id).await?;
        self.chats.delete(chat_id).await?;
        Ok(())
    }

    async fn find_canonical(
        &self,
        initiator_id: &UserId,
        target_id: &UserId,
    ) -> ApplicationResult<Option<Chat>> {
        if initiator_id == target_id {
            Ok(self.chats.find_self_chat(initiator_id).await?)
        } else {
            Ok(self.chats.find_two_party(initiator_id, target_id).await?)
        }
    }

    async fn require_user(&self, user_id: &UserId) -> ApplicationResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id.clone()).into())
    }

    async fn require_chat(&self, chat_id: ChatId) -> ApplicationResult<Chat> {
        self.chats
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| DomainError::ChatNotFound(chat_id).into())
    }

    async fn announce(&self, chat: &Chat, user_id: &UserId) {
        if let Err(err) = self
            .channel
            .send_to_user(user_id, ServerEvent::ChatCreated(chat.clone()))
            .await
        {
            warn!(error = %err, %user_id, chat_id = %chat.id, "failed to announce chat");
        }
    }
}

#[cfg(test)]
#[path = "chats_tests.rs"]
mod chats_tests;
