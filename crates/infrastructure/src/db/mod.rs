//! 数据库工具与仓储实现（核心 DB 层）

use sqlx::{Pool, Postgres};

pub mod repositories;

pub use repositories::{PgChatRepository, PgMessageRepository, PgUserRepository};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_size)
        .connect(database_url)
        .await
}

/// sqlx 错误到仓储错误的统一映射。
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> domain::RepositoryError {
    match err {
        sqlx::Error::RowNotFound => domain::RepositoryError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            domain::RepositoryError::Conflict
        }
        other => domain::RepositoryError::storage(other.to_string()),
    }
}
