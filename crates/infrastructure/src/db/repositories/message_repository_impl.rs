//! 消息 Repository 实现

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query_as, FromRow};

use application::repository::{MessageRepository, NewMessage};
use domain::{ChatId, Message, MessageId, RepositoryError, UserId};

use crate::db::{map_sqlx_error, DbPool};

/// 数据库消息模型
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: String,
    pub body: String,
    pub publish_date: DateTime<Utc>,
}

impl From<DbMessage> for Message {
    fn from(row: DbMessage) -> Self {
        Message {
            id: MessageId::new(row.id),
            chat_id: ChatId::new(row.chat_id),
            sender_id: UserId::from(row.sender_id),
            body: row.body,
            publish_date: row.publish_date,
        }
    }
}

const MESSAGE_COLUMNS: &str = "id, chat_id, sender_id, body, publish_date";

pub struct PgMessageRepository {
    pool: Arc<DbPool>,
}

impl PgMessageRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn add(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let row = query_as::<_, DbMessage>(&format!(
            "INSERT INTO messages (chat_id, sender_id, body, publish_date) \
             VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(i64::from(message.chat_id))
        .bind(message.sender_id.as_str())
        .bind(&message.body)
        .bind(message.publish_date)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn latest_in_chat(&self, chat_id: ChatId) -> Result<Option<Message>, RepositoryError> {
        let row = query_as::<_, DbMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = $1 \
             ORDER BY publish_date DESC, id DESC LIMIT 1"
        ))
        .bind(i64::from(chat_id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }
}
