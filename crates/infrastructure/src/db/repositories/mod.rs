//! Repository 实现模块
//!
//! 包含所有数据访问层的具体实现

pub mod chat_repository_impl;
pub mod message_repository_impl;
pub mod user_repository_impl;

pub use chat_repository_impl::PgChatRepository;
pub use message_repository_impl::PgMessageRepository;
pub use user_repository_impl::PgUserRepository;
