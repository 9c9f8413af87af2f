//! 即时通讯投递核心的领域模型
//!
//! 包含用户、会话（Chat）、消息、通知等核心实体，以及
//! 实时通道上的事件类型定义。

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use value_objects::*;
