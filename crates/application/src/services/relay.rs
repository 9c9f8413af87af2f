//! 消息中继
//!
//! 持久化入站消息，并按接收方的在线状态在实时通道与推送之间
//! 选路。两个入口的路由策略不同：定向发送由在线状态决定走哪条
//! 路，会话群发总是同时做房间扇出和主题推送。
//!
//! 顺序保证：对单次发送，持久化一定在任何扇出之前完成；持久化
//! 失败则中止，不会投递未落库的消息。推送失败只记录，不回滚。

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use domain::{
    ChatId, DomainError, InAppNotification, Message, MessageId, PushNotification, ServerEvent,
    Timestamp, UserId,
};

use crate::channel::LiveChannel;
use crate::clock::Clock;
use crate::error::ApplicationResult;
use crate::groups::GroupKey;
use crate::notifier::NotificationDispatcher;
use crate::presence::PresenceTracker;
use crate::repository::{ChatRepository, MessageRepository, NewMessage, UserRepository};

/// 客户端提交的消息负载。
///
/// `id` 被接受但忽略：持久化时由存储重新分配。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: MessageId,
    #[serde(alias = "chat_id")]
    pub chat_id: ChatId,
    pub body: String,
    #[serde(default, alias = "publish_date")]
    pub publish_date: Option<Timestamp>,
}

pub struct MessageRelayDependencies {
    pub users: Arc<dyn UserRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub presence: Arc<dyn PresenceTracker>,
    pub channel: Arc<dyn LiveChannel>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageRelay {
    users: Arc<dyn UserRepository>,
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    presence: Arc<dyn PresenceTracker>,
    channel: Arc<dyn LiveChannel>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl MessageRelay {
    pub fn new(deps: MessageRelayDependencies) -> Self {
        Self {
            users: deps.users,
            chats: deps.chats,
            messages: deps.messages,
            presence: deps.presence,
            channel: deps.channel,
            dispatcher: deps.dispatcher,
            clock: deps.clock,
        }
    }

    /// 定向发送：接收方在线走实时通道，离线走设备 token 推送。
    ///
    /// 离线且没有注册 token 时消息仅持久化，投递静默延迟到
    /// 接收方下次拉取。
    pub async fn send_direct(
        &self,
        sender_id: &UserId,
        recipient_id: &UserId,
        incoming: IncomingMessage,
    ) -> ApplicationResult<Message> {
        let chat = self
            .chats
            .find_by_id(incoming.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound(incoming.chat_id))?;

        debug!(%sender_id, %recipient_id, chat_id = %chat.id, "direct send");
        let message = self.persist(sender_id, &incoming, chat.id).await?;

        if sender_id != recipient_id {
            if self.presence.is_online(recipient_id).await? {
                debug!(%recipient_id, "recipient online, delivering over live channel");
                if let Err(err) = self
                    .channel
                    .send_to_user(recipient_id, ServerEvent::MessageReceived(message.clone()))
                    .await
                {
                    warn!(error = %err, %recipient_id, "live delivery failed");
                }
            } else {
                let tokens = self.users.notification_tokens(recipient_id).await?;
                if tokens.is_empty() {
                    debug!(%recipient_id, "recipient offline with no tokens, delivery deferred");
                } else {
                    // 标题按接收方视角解析：两人会话里是发送方的名字
                    let title = chat.display_for(recipient_id).name;
                    let push = PushNotification::to_tokens(
                        tokens,
                        sender_id.as_str(),
                        title,
                        message.body.clone(),
                    );
                    self.dispatch_best_effort(push).await;
                }
            }
        }

        Ok(message)
    }

    /// 会话群发：解析原始 JSON 负载，房间扇出和主题推送无条件
    /// 各执行一次，不看任何成员的在线状态。
    ///
    /// 主题订阅由推送提供方管理，发送方不抑制主题推送本身，
    /// 靠通知里的 sender 元数据让客户端过滤自己的消息。
    pub async fn send_to_chat(
        &self,
        sender_id: &UserId,
        message_json: &str,
    ) -> ApplicationResult<Message> {
        let incoming: IncomingMessage = serde_json::from_str(message_json)
            .map_err(|err| DomainError::invalid_payload(err.to_string()))?;

        let chat = self
            .chats
            .find_by_id(incoming.chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound(incoming.chat_id))?;

        debug!(%sender_id, chat_id = %chat.id, "chat broadcast send");
        let message = self.persist(sender_id, &incoming, chat.id).await?;

        if let Err(err) = self
            .channel
            .send_to_group(
                &GroupKey::chat(chat.id),
                ServerEvent::MessageReceived(message.clone()),
            )
            .await
        {
            warn!(error = %err, chat_id = %chat.id, "group fanout failed");
        }

        let title = chat.display_from(sender_id).name;
        let push = PushNotification::to_topic(
            chat.id.to_string(),
            sender_id.as_str(),
            title,
            message.body.clone(),
        );
        self.dispatch_best_effort(push).await;

        Ok(message)
    }

    /// 应用内通知：在线走实时通道，离线走 token 推送。
    pub async fn notify_user(
        &self,
        user_id: &UserId,
        notification: InAppNotification,
    ) -> ApplicationResult<()> {
        let _ = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id.clone()))?;

        if self.presence.is_online(user_id).await? {
            if let Err(err) = self
                .channel
                .send_to_user(user_id, ServerEvent::NotificationReceived(notification))
                .await
            {
                warn!(error = %err, %user_id, "in-app notification delivery failed");
            }
            return Ok(());
        }

        let tokens = self.users.notification_tokens(user_id).await?;
        if tokens.is_empty() {
            debug!(%user_id, "no tokens registered, notification dropped");
            return Ok(());
        }
        self.dispatcher
            .dispatch(PushNotification::to_tokens(
                tokens,
                notification.sender.as_str(),
                notification.title,
                notification.body,
            ))
            .await?;
        Ok(())
    }

    /// 批量通知：按在线状态把接收方分成实时通道和推送两组，
    /// 离线组的 token 汇总成一次推送。
    pub async fn notify_users(
        &self,
        user_ids: &[UserId],
        notification: InAppNotification,
    ) -> ApplicationResult<()> {
        let users = self.users.find_many(user_ids).await?;

        let mut offline = Vec::new();
        for user in &users {
            if self.presence.is_online(&user.id).await? {
                if let Err(err) = self
                    .channel
                    .send_to_user(
                        &user.id,
                        ServerEvent::NotificationReceived(notification.clone()),
                    )
                    .await
                {
                    warn!(error = %err, user_id = %user.id, "in-app notification delivery failed");
                }
            } else {
                offline.push(&user.id);
            }
        }

        let mut tokens = Vec::new();
        for user_id in offline {
            tokens.extend(self.users.notification_tokens(user_id).await?);
        }
        if !tokens.is_empty() {
            self.dispatcher
                .dispatch(PushNotification::to_tokens(
                    tokens,
                    notification.sender.as_str(),
                    notification.title,
                    notification.body,
                ))
                .await?;
        }
        Ok(())
    }

    /// 持久化消息并推进会话的 last_edited。任何扇出之前完成。
    async fn persist(
        &self,
        sender_id: &UserId,
        incoming: &IncomingMessage,
        chat_id: ChatId,
    ) -> ApplicationResult<Message> {
        let publish_date = incoming.publish_date.unwrap_or_else(|| self.clock.now());
        let message = self
            .messages
            .add(NewMessage {
                chat_id,
                sender_id: sender_id.clone(),
                body: incoming.body.clone(),
                publish_date,
            })
            .await?;
        self.chats
            .update_last_edited(chat_id, message.publish_date)
            .await?;
        Ok(message)
    }

    async fn dispatch_best_effort(&self, push: PushNotification) {
        if let Err(err) = self.dispatcher.dispatch(push).await {
            warn!(error = %err, "push dispatch failed");
        }
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod relay_tests;
