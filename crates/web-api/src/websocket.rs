//! WebSocket 处理器
//!
//! 连接升级、认证、客户端帧路由和连接生命周期管理。每条连接
//! 注册到实时通道并计入在线状态；断开时注销连接、清空组成员
//! 关系并递减会话计数。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use application::{GroupKey, IncomingMessage};
use domain::{ChatId, ConnectionId, InAppNotification, UserId, UserStatus};

use crate::state::AppState;

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token
    pub token: String,
}

/// 客户端经 WebSocket 发来的帧。
#[derive(Debug, Deserialize)]
#[serde(tag = "method", content = "data", rename_all = "camelCase")]
enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    SendToUser {
        recipient_id: UserId,
        message: IncomingMessage,
    },
    /// 消息负载保持原始 JSON 字符串，由中继解析
    SendToChat { message: String },
    SendUserStatus { status: UserStatus },
    #[serde(rename_all = "camelCase")]
    SendTypingStatus { chat_id: ChatId, status: UserStatus },
    #[serde(rename_all = "camelCase")]
    SubscribeToUsersStatus { user_ids: Vec<UserId> },
    #[serde(rename_all = "camelCase")]
    UnsubscribeFromUsersStatus { user_ids: Vec<UserId> },
    #[serde(rename_all = "camelCase")]
    SubscribeToChats { chat_ids: Vec<ChatId> },
    #[serde(rename_all = "camelCase")]
    UnsubscribeFromChats { chat_ids: Vec<ChatId> },
    #[serde(rename_all = "camelCase")]
    NotifyUser {
        user_id: UserId,
        notification: InAppNotification,
    },
    #[serde(rename_all = "camelCase")]
    NotifyUsers {
        user_ids: Vec<UserId>,
        notification: InAppNotification,
    },
}

/// WebSocket 写操作命令，统一经一个通道串行化
#[derive(Debug)]
enum WsCommand {
    SendText(String),
    SendPong(Vec<u8>),
}

/// 处理 WebSocket 连接升级
pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response, StatusCode> {
    if query.token.is_empty() {
        warn!("websocket upgrade failed: empty token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user_id = match state.jwt.verify_token(&query.token) {
        Ok(claims) => UserId::from(claims.uid),
        Err(_) => {
            warn!("websocket upgrade failed: invalid token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    info!(%user_id, "websocket upgrade");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// 单条连接的主循环。
async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let connection_id = ConnectionId::generate();
    let mut events = state.live.register(&user_id, connection_id);

    if let Err(err) = state.presence.handle_connect(&user_id).await {
        warn!(error = %err, %user_id, "failed to record connection");
    }
    info!(%user_id, %connection_id, "websocket connected");

    let (mut sender, mut incoming) = socket.split();
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

    // 发送任务：实时事件和写命令都经这里落到 socket 上
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(cmd) = cmd_rx.recv() => {
                    let message = match cmd {
                        WsCommand::SendText(text) => WsMessage::Text(text.into()),
                        WsCommand::SendPong(data) => WsMessage::Pong(data.into()),
                    };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                Some(event) = events.recv() => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(err) => {
                            warn!(error = %err, "failed to serialize websocket payload");
                            continue;
                        }
                    };
                    if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
        debug!("websocket send task finished");
    });

    // 接收任务：客户端帧路由到投递核心
    let recv_state = state.clone();
    let recv_user_id = user_id.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = incoming.next().await {
            match message {
                WsMessage::Text(text) => {
                    handle_text_frame(
                        &recv_state,
                        &recv_user_id,
                        connection_id,
                        text.as_str(),
                        &cmd_tx,
                    )
                    .await;
                }
                WsMessage::Ping(data) => {
                    if cmd_tx.send(WsCommand::SendPong(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                WsMessage::Pong(_) | WsMessage::Binary(_) => {}
                WsMessage::Close(_) => {
                    debug!("websocket closed by client");
                    break;
                }
            }
        }
        debug!("websocket receive task finished");
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    // 断开清理：注销连接、清空组成员、递减会话计数
    state.live.unregister(&user_id, connection_id);
    state.groups.leave_all(connection_id);
    if let Err(err) = state.presence.handle_disconnect(&user_id).await {
        warn!(error = %err, %user_id, "failed to record disconnection");
    }
    info!(%user_id, %connection_id, "websocket disconnected");
}

async fn handle_text_frame(
    state: &AppState,
    user_id: &UserId,
    connection_id: ConnectionId,
    text: &str,
    cmd_tx: &mpsc::Sender<WsCommand>,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            debug!(error = %err, %user_id, "rejecting malformed frame");
            send_error(cmd_tx, format!("malformed frame: {}", err)).await;
            return;
        }
    };

    if let Err(err) = dispatch_frame(state, user_id, connection_id, frame).await {
        send_error(cmd_tx, err).await;
    }
}

async fn dispatch_frame(
    state: &AppState,
    user_id: &UserId,
    connection_id: ConnectionId,
    frame: ClientFrame,
) -> Result<(), String> {
    match frame {
        ClientFrame::SendToUser {
            recipient_id,
            message,
        } => {
            state
                .relay
                .send_direct(user_id, &recipient_id, message)
                .await
                .map_err(|err| err.to_string())?;
        }
        ClientFrame::SendToChat { message } => {
            state
                .relay
                .send_to_chat(user_id, &message)
                .await
                .map_err(|err| err.to_string())?;
        }
        ClientFrame::SendUserStatus { status } => {
            state.presence.set_own_status(user_id, status).await;
        }
        ClientFrame::SendTypingStatus { chat_id, status } => {
            state
                .presence
                .set_typing_status(user_id, chat_id, status)
                .await;
        }
        ClientFrame::SubscribeToUsersStatus { user_ids } => {
            for target in user_ids {
                state.groups.join(connection_id, GroupKey::status(target));
            }
        }
        ClientFrame::UnsubscribeFromUsersStatus { user_ids } => {
            for target in user_ids {
                state
                    .groups
                    .leave(connection_id, &GroupKey::status(target));
            }
        }
        ClientFrame::SubscribeToChats { chat_ids } => {
            for chat_id in chat_ids {
                state.groups.join(connection_id, GroupKey::chat(chat_id));
            }
        }
        ClientFrame::UnsubscribeFromChats { chat_ids } => {
            for chat_id in chat_ids {
                state.groups.leave(connection_id, &GroupKey::chat(chat_id));
            }
        }
        ClientFrame::NotifyUser {
            user_id: target,
            notification,
        } => {
            state
                .relay
                .notify_user(&target, notification)
                .await
                .map_err(|err| err.to_string())?;
        }
        ClientFrame::NotifyUsers {
            user_ids,
            notification,
        } => {
            state
                .relay
                .notify_users(&user_ids, notification)
                .await
                .map_err(|err| err.to_string())?;
        }
    }
    Ok(())
}

async fn send_error(cmd_tx: &mpsc::Sender<WsCommand>, message: String) {
    let frame = json!({
        "event": "Error",
        "data": { "message": message },
    });
    if cmd_tx
        .send(WsCommand::SendText(frame.to_string()))
        .await
        .is_err()
    {
        warn!("failed to queue error frame");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_deserialize_from_camel_case() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"method": "sendToUser", "data": {"recipientId": "b", "message": {"chatId": 1, "body": "hi"}}}"#,
        )
        .unwrap();
        assert!(matches!(frame, ClientFrame::SendToUser { .. }));

        let frame: ClientFrame = serde_json::from_str(
            r#"{"method": "subscribeToUsersStatus", "data": {"userIds": ["a", "b"]}}"#,
        )
        .unwrap();
        let ClientFrame::SubscribeToUsersStatus { user_ids } = frame else {
            panic!("wrong variant");
        };
        assert_eq!(user_ids, vec![UserId::from("a"), UserId::from("b")]);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"method": "launchMissiles"}"#);
        assert!(result.is_err());
    }
}
