//! 集成测试支撑：内存存储上的完整服务装配。

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use application::repository::memory::InMemoryStore;
use application::{
    ChatResolver, ChatResolverDependencies, GroupRegistry, LocalPresenceTracker, MessageRelay,
    MessageRelayDependencies, PresenceService, PresenceTracker, SystemClock,
};
use domain::{User, UserId};
use infrastructure::{LoggingDispatcher, WsLiveChannel};
use web_api::{router, AppState, JwtConfig, JwtService};

pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryStore>,
    pub jwt: Arc<JwtService>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.insert_user(user("a", "Alice", "Adams")).await;
        store.insert_user(user("b", "Bob", "Brown")).await;
        store.insert_user(user("c", "Cleo", "Clark")).await;

        let clock = Arc::new(SystemClock);
        let groups = Arc::new(GroupRegistry::new());
        let live = Arc::new(WsLiveChannel::new(groups.clone()));
        let tracker: Arc<dyn PresenceTracker> =
            Arc::new(LocalPresenceTracker::new(store.clone(), clock.clone()));
        let presence = Arc::new(PresenceService::new(
            tracker.clone(),
            live.clone(),
            clock.clone(),
        ));

        let relay = Arc::new(MessageRelay::new(MessageRelayDependencies {
            users: store.clone(),
            chats: store.clone(),
            messages: store.clone(),
            presence: tracker,
            channel: live.clone(),
            dispatcher: Arc::new(LoggingDispatcher),
            clock: clock.clone(),
        }));

        let resolver = Arc::new(ChatResolver::new(ChatResolverDependencies {
            users: store.clone(),
            chats: store.clone(),
            messages: store.clone(),
            channel: live.clone(),
            clock,
        }));

        let jwt = Arc::new(JwtService::new(JwtConfig {
            secret: "test-secret-key-minimum-32-characters!".to_string(),
            expiration_hours: 24,
        }));

        let state = AppState::new(relay, resolver, presence, groups, live, jwt.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = router(state);
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            store,
            jwt,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        self.jwt
            .generate_token(&UserId::from(user_id))
            .expect("token")
    }

    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/api/v1/ws?token={}", self.addr, token)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub fn user(id: &str, first: &str, last: &str) -> User {
    User {
        id: UserId::from(id),
        user_name: first.to_lowercase(),
        first_name: first.to_owned(),
        last_name: last.to_owned(),
        photo_url: None,
        last_online: None,
    }
}
