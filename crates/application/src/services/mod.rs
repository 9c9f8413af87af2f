mod chats;
mod relay;

pub use chats::{ChatResolver, ChatResolverDependencies};
pub use relay::{IncomingMessage, MessageRelay, MessageRelayDependencies};
