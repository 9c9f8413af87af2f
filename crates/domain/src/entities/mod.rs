pub mod chat;
pub mod message;
pub mod notification;
pub mod status;
pub mod user;

pub use chat::{Chat, ChatDisplay, ChatSummary};
pub use message::Message;
pub use notification::{InAppNotification, Platform, PushNotification, PushTarget};
pub use status::UserStatus;
pub use user::User;
