use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use domain::{Chat, ChatId, ChatSummary, UserId};

use crate::{error::ApiError, state::AppState, websocket};

#[derive(Debug, Deserialize)]
struct CreateGroupChatPayload {
    name: String,
    members: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_chats).post(create_group_chat))
        .route("/chats/{chat_id}", get(get_chat).delete(delete_chat))
        .route("/chats/with/{user_id}", post(resolve_chat))
        .route(
            "/chats/{chat_id}/participants/{user_id}",
            put(add_participant).delete(remove_participant),
        )
        .route("/ws", get(websocket::upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// 观察者的会话列表，展示字段已按观察者视角解析。
async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    let viewer = state.jwt.extract_user_from_headers(&headers)?;
    let chats = state.chats.list_user_chats(&viewer).await?;
    Ok(Json(chats))
}

async fn get_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<i64>,
) -> Result<Json<ChatSummary>, ApiError> {
    let viewer = state.jwt.extract_user_from_headers(&headers)?;
    let summary = state.chats.get_chat(&viewer, ChatId::new(chat_id)).await?;
    Ok(Json(summary))
}

/// 获取或创建与目标用户的规范两人会话。
async fn resolve_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<ChatSummary>, ApiError> {
    let viewer = state.jwt.extract_user_from_headers(&headers)?;
    let target = UserId::from(user_id);
    let chat = state
        .chats
        .get_or_create_two_party_chat(&viewer, &target)
        .await?;
    let summary = state.chats.get_chat(&viewer, chat.id).await?;
    Ok(Json(summary))
}

async fn create_group_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupChatPayload>,
) -> Result<(StatusCode, Json<Chat>), ApiError> {
    let creator = state.jwt.extract_user_from_headers(&headers)?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("chat name cannot be empty"));
    }
    let members: Vec<UserId> = payload.members.into_iter().map(UserId::from).collect();
    let chat = state
        .chats
        .create_group_chat(&creator, payload.name, &members)
        .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

async fn add_participant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((chat_id, user_id)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state.jwt.extract_user_from_headers(&headers)?;
    state
        .chats
        .add_user_to_chat(ChatId::new(chat_id), &UserId::from(user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_participant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((chat_id, user_id)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state.jwt.extract_user_from_headers(&headers)?;
    state
        .chats
        .remove_user_from_chat(ChatId::new(chat_id), &UserId::from(user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.jwt.extract_user_from_headers(&headers)?;
    state.chats.delete_chat(ChatId::new(chat_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
