//! 基础设施层。
//!
//! 投递核心协作者的具体实现：PostgreSQL 存储、进程内 WebSocket
//! 实时通道、FCM 推送网关适配器。

pub mod db;
pub mod live;
pub mod push;

pub use db::{
    create_pool, DbPool, PgChatRepository, PgMessageRepository, PgUserRepository,
};
pub use live::WsLiveChannel;
pub use push::{FcmConfig, FcmDispatcher, LoggingDispatcher};
