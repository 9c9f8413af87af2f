//! 应用层实现。
//!
//! 投递核心：在线状态追踪、组订阅、消息中继和会话解析，
//! 以及对外部协作者（存储、实时通道、推送网关）的抽象。

pub mod channel;
pub mod clock;
pub mod error;
pub mod groups;
pub mod notifier;
pub mod presence;
pub mod repository;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use channel::{ChannelError, LiveChannel};
pub use clock::{Clock, SystemClock};
pub use error::{ApplicationError, ApplicationResult};
pub use groups::{GroupKey, GroupRegistry};
pub use notifier::{DispatchError, NotificationDispatcher};
pub use presence::{LocalPresenceTracker, PresenceService, PresenceTracker};
pub use repository::{
    ChatRepository, MessageRepository, NewChat, NewMessage, UserRepository,
};
pub use services::{
    ChatResolver, ChatResolverDependencies, IncomingMessage, MessageRelay,
    MessageRelayDependencies,
};
