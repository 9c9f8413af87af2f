//! 用户 Repository 实现

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, query_scalar, FromRow};

use application::repository::UserRepository;
use domain::{RepositoryError, Timestamp, User, UserId};

use crate::db::{map_sqlx_error, DbPool};

/// 数据库用户模型
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    pub id: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
    pub last_online: Option<DateTime<Utc>>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
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

const USER_COLUMNS: &str = "id, user_name, first_name, last_name, photo_url, last_online";

pub struct PgUserRepository {
    pool: Arc<DbPool>,
}

impl PgUserRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let rows = query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn notification_tokens(&self, id: &UserId) -> Result<Vec<String>, RepositoryError> {
        query_scalar::<_, String>(
            "SELECT token FROM notification_tokens WHERE user_id = $1 ORDER BY registered_at",
        )
        .bind(id.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_last_online(&self, id: &UserId, at: Timestamp) -> Result<(), RepositoryError> {
        let result = query("UPDATE users SET last_online = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
