//! 主应用程序入口
//!
//! 装配投递核心并启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    ChatResolver, ChatResolverDependencies, GroupRegistry, LocalPresenceTracker, MessageRelay,
    MessageRelayDependencies, NotificationDispatcher, PresenceService, PresenceTracker,
    SystemClock,
};
use config::AppConfig;
use infrastructure::{
    create_pool, FcmConfig, FcmDispatcher, LoggingDispatcher, PgChatRepository,
    PgMessageRepository, PgUserRepository, WsLiveChannel,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').last().unwrap_or("unknown")
    );

    let pg_pool = Arc::new(
        create_pool(&config.database.url, config.database.max_connections).await?,
    );
    sqlx::migrate!("../../migrations").run(pg_pool.as_ref()).await?;

    // 存储层
    let users = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let chats = Arc::new(PgChatRepository::new(pg_pool.clone()));
    let messages = Arc::new(PgMessageRepository::new(pg_pool));

    // 投递核心
    let clock = Arc::new(SystemClock);
    let groups = Arc::new(GroupRegistry::new());
    let live = Arc::new(WsLiveChannel::new(groups.clone()));
    let tracker: Arc<dyn PresenceTracker> =
        Arc::new(LocalPresenceTracker::new(users.clone(), clock.clone()));
    let presence = Arc::new(PresenceService::new(
        tracker.clone(),
        live.clone(),
        clock.clone(),
    ));

    // 推送网关：无凭据时降级为日志替身
    let dispatcher: Arc<dyn NotificationDispatcher> = match &config.push.server_key {
        Some(server_key) => {
            let mut fcm_config = FcmConfig::new(server_key.clone());
            if let Some(endpoint) = &config.push.endpoint {
                fcm_config.endpoint = endpoint.clone();
            }
            Arc::new(FcmDispatcher::new(fcm_config))
        }
        None => {
            tracing::warn!("FCM_SERVER_KEY not set, push notifications are log-only");
            Arc::new(LoggingDispatcher)
        }
    };

    let relay = Arc::new(MessageRelay::new(MessageRelayDependencies {
        users: users.clone(),
        chats: chats.clone(),
        messages: messages.clone(),
        presence: tracker,
        channel: live.clone(),
        dispatcher,
        clock: clock.clone(),
    }));

    let resolver = Arc::new(ChatResolver::new(ChatResolverDependencies {
        users,
        chats,
        messages,
        channel: live.clone(),
        clock,
    }));

    let jwt = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState::new(relay, resolver, presence, groups, live, jwt);

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天投递服务启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
