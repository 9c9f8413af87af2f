//! 会话 Repository 实现
//!
//! 会话行与参与者集合分两步加载；两人会话与自聊会话通过
//! `direct_key` 唯一列查找和去重，并发创建同一用户对时
//! 唯一约束把后到的一方变成 Conflict。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow};

use application::repository::{two_party_key, ChatRepository, NewChat};
use domain::{Chat, ChatId, RepositoryError, Timestamp, User, UserId};

use crate::db::{map_sqlx_error, DbPool};

/// 数据库会话模型，参与者单独加载。
#[derive(Debug, Clone, FromRow)]
struct DbChat {
    pub id: i64,
    pub name: String,
    pub last_edited: DateTime<Utc>,
    pub photo_url: Option<String>,
}

impl DbChat {
    fn into_chat(self, participants: Vec<User>) -> Chat {
        Chat {
            id: ChatId::new(self.id),
            name: self.name,
            last_edited: self.last_edited,
            photo_url: self.photo_url,
            participants,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbParticipant {
    pub id: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
    pub last_online: Option<DateTime<Utc>>,
}

impl From<DbParticipant> for User {
    fn from(row: DbParticipant) -> Self {
        User {
            id: UserId::from(row.id),
            user_name: row.user_name,
            first_name: row.first_name,
            last_name: row.last_name,
            photo_url: row.photo_url,
            last_online: row.last_online,
        }
    }
}

const CHAT_COLUMNS: &str = "id, name, last_edited, photo_url";

pub struct PgChatRepository {
    pool: Arc<DbPool>,
}

impl PgChatRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    async fn load_participants(&self, chat_id: i64) -> Result<Vec<User>, RepositoryError> {
        let rows = query_as::<_, DbParticipant>(
            r#"
            SELECT u.id, u.user_name, u.first_name, u.last_name, u.photo_url, u.last_online
            FROM users u
            JOIN chat_participants p ON p.user_id = u.id
            WHERE p.chat_id = $1
            ORDER BY u.id
            "#,
        )
        .bind(chat_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn hydrate(&self, row: Option<DbChat>) -> Result<Option<Chat>, RepositoryError> {
        match row {
            Some(row) => {
                let participants = self.load_participants(row.id).await?;
                Ok(Some(row.into_chat(participants)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn create(&self, chat: NewChat) -> Result<Chat, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = query_as::<_, DbChat>(&format!(
            "INSERT INTO chats (name, last_edited, photo_url, direct_key) \
             VALUES ($1, $2, $3, $4) RETURNING {CHAT_COLUMNS}"
        ))
        .bind(&chat.name)
        .bind(chat.last_edited)
        .bind(&chat.photo_url)
        .bind(&chat.direct_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for user_id in &chat.participants {
            query("INSERT INTO chat_participants (chat_id, user_id) VALUES ($1, $2)")
                .bind(row.id)
                .bind(user_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        let participants = self.load_participants(row.id).await?;
        Ok(row.into_chat(participants))
    }

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let row = query_as::<_, DbChat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"
        ))
        .bind(i64::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.hydrate(row).await
    }

    async fn find_two_party(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Chat>, RepositoryError> {
        let row = query_as::<_, DbChat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE direct_key = $1"
        ))
        .bind(two_party_key(a, b))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.hydrate(row).await
    }

    async fn find_self_chat(&self, user_id: &UserId) -> Result<Option<Chat>, RepositoryError> {
        self.find_two_party(user_id, user_id).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
        let rows = query_as::<_, DbChat>(&format!(
            r#"
            SELECT {CHAT_COLUMNS} FROM chats c
            WHERE EXISTS (
                SELECT 1 FROM chat_participants p
                WHERE p.chat_id = c.id AND p.user_id = $1
            )
            ORDER BY c.last_edited DESC
            "#
        ))
        .bind(user_id.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in rows {
            let participants = self.load_participants(row.id).await?;
            chats.push(row.into_chat(participants));
        }
        Ok(chats)
    }

    async fn update_last_edited(&self, id: ChatId, at: Timestamp) -> Result<(), RepositoryError> {
        let result = query("UPDATE chats SET last_edited = $2 WHERE id = $1")
            .bind(i64::from(id))
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn add_participant(&self, id: ChatId, user_id: &UserId) -> Result<(), RepositoryError> {
        query(
            "INSERT INTO chat_participants (chat_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(i64::from(id))
        .bind(user_id.as_str())
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn remove_participant(
        &self,
        id: ChatId,
        user_id: &UserId,
    ) -> Result<(), RepositoryError> {
        query("DELETE FROM chat_participants WHERE chat_id = $1 AND user_id = $2")
            .bind(i64::from(id))
            .bind(user_id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, id: ChatId) -> Result<(), RepositoryError> {
        // 参与者与消息由外键级联删除
        let result = query("DELETE FROM chats WHERE id = $1")
            .bind(i64::from(id))
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
