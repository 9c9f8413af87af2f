//! Web API 层。
//!
//! 提供 Axum 路由，把 HTTP 请求委托给会话解析服务，把 WebSocket
//! 连接接入实时投递核心（在线状态、组订阅、消息中继）。

mod auth;
mod error;
mod routes;
mod state;
mod websocket;

pub use auth::{Claims, JwtService};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
