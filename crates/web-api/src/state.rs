use std::sync::Arc;

use application::{ChatResolver, GroupRegistry, MessageRelay, PresenceService};
use infrastructure::WsLiveChannel;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<MessageRelay>,
    pub chats: Arc<ChatResolver>,
    pub presence: Arc<PresenceService>,
    pub groups: Arc<GroupRegistry>,
    pub live: Arc<WsLiveChannel>,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        relay: Arc<MessageRelay>,
        chats: Arc<ChatResolver>,
        presence: Arc<PresenceService>,
        groups: Arc<GroupRegistry>,
        live: Arc<WsLiveChannel>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            relay,
            chats,
            presence,
            groups,
            live,
            jwt,
        }
    }
}
