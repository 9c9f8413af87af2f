//! FCM 推送网关适配器
//!
//! 走 FCM legacy HTTP 接口：token 列表用 `registration_ids`，
//! 主题用 `to: /topics/<id>`。发送者 id 放进 data 负载，
//! 客户端据此去重自己发出的消息。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use application::notifier::{DispatchError, NotificationDispatcher};
use domain::{PushNotification, PushTarget};

pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub endpoint: String,
    pub server_key: String,
}

impl FcmConfig {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_FCM_ENDPOINT.to_owned(),
            server_key: server_key.into(),
        }
    }
}

pub struct FcmDispatcher {
    http: Client,
    config: FcmConfig,
}

impl FcmDispatcher {
    pub fn new(config: FcmConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for FcmDispatcher {
    async fn dispatch(&self, notification: PushNotification) -> Result<(), DispatchError> {
        let mut payload = json!({
            "priority": "high",
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
            "data": {
                "sender": notification.sender,
            },
        });

        match &notification.target {
            PushTarget::Tokens(tokens) => {
                if tokens.is_empty() {
                    debug!("skipping push without registration tokens");
                    return Ok(());
                }
                payload["registration_ids"] = json!(tokens);
            }
            PushTarget::Topic(topic) => {
                payload["to"] = json!(format!("/topics/{topic}"));
            }
        }

        let response = self
            .http
            .post(&self.config.endpoint)
            .header("Authorization", format!("key={}", self.config.server_key))
            .json(&payload)
            .send()
            .await
            .map_err(|err| DispatchError::failed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::failed(format!(
                "fcm returned {status}: {body}"
            )));
        }

        debug!(sender = %notification.sender, "push dispatched");
        Ok(())
    }
}

/// 无推送凭据时的替身：只记录日志，不外发。
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(&self, notification: PushNotification) -> Result<(), DispatchError> {
        info!(
            sender = %notification.sender,
            title = %notification.title,
            target = ?notification.target,
            "push dispatch (logging only)"
        );
        Ok(())
    }
}
