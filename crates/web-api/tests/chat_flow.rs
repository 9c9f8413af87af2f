//! 会话 HTTP 接口的端到端流程。

mod support;

use reqwest::{Client, StatusCode};
use serde_json::json;

use support::TestApp;

#[tokio::test]
async fn two_party_chat_resolution_flow() {
    let app = TestApp::spawn().await;
    let client = Client::new();
    let token_a = app.token_for("a");

    // 解析 a↔b 的两人会话，展示字段按观察者视角
    let chat = client
        .post(app.http("/api/v1/chats/with/b"))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("resolve chat")
        .json::<serde_json::Value>()
        .await
        .expect("chat json");
    assert_eq!(chat["name"], "Bob Brown");
    let chat_id = chat["id"].as_i64().expect("chat id");

    // 再次解析得到同一个会话
    let again = client
        .post(app.http("/api/v1/chats/with/b"))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("resolve again")
        .json::<serde_json::Value>()
        .await
        .expect("chat json");
    assert_eq!(again["id"].as_i64(), Some(chat_id));

    // 对方视角下名字是 Alice
    let token_b = app.token_for("b");
    let for_b = client
        .get(app.http(&format!("/api/v1/chats/{}", chat_id)))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("get chat")
        .json::<serde_json::Value>()
        .await
        .expect("chat json");
    assert_eq!(for_b["name"], "Alice Adams");

    // 没有消息的两人会话不进入列表
    let chats = client
        .get(app.http("/api/v1/chats"))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("list chats")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("chats json");
    assert!(chats.is_empty());
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .get(app.http("/api/v1/chats"))
        .send()
        .await
        .expect("list chats");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cross_origin_requests_are_permitted() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .get(app.http("/health"))
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .expect("health");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn unknown_chat_returns_not_found() {
    let app = TestApp::spawn().await;
    let client = Client::new();
    let token = app.token_for("a");

    let response = client
        .get(app.http("/api/v1/chats/404"))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("get chat");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.json::<serde_json::Value>().await.expect("body");
    assert_eq!(body["code"], "CHAT_NOT_FOUND");
}

#[tokio::test]
async fn group_chat_membership_flow() {
    let app = TestApp::spawn().await;
    let client = Client::new();
    let token = app.token_for("a");

    let chat = client
        .post(app.http("/api/v1/chats"))
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({"name": "team", "members": ["b"]}))
        .send()
        .await
        .expect("create group");
    assert_eq!(chat.status(), StatusCode::CREATED);
    let chat = chat.json::<serde_json::Value>().await.expect("chat json");
    let chat_id = chat["id"].as_i64().expect("chat id");
    assert_eq!(chat["participants"].as_array().map(Vec::len), Some(2));

    // 加入 c，再移除 b
    let response = client
        .put(app.http(&format!("/api/v1/chats/{}/participants/c", chat_id)))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("add participant");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .delete(app.http(&format!("/api/v1/chats/{}/participants/b", chat_id)))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("remove participant");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let summary = client
        .get(app.http(&format!("/api/v1/chats/{}", chat_id)))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("get chat")
        .json::<serde_json::Value>()
        .await
        .expect("chat json");
    let participants: Vec<String> = summary["participants"]
        .as_array()
        .expect("participants")
        .iter()
        .map(|p| p["id"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert!(participants.contains(&"a".to_owned()));
    assert!(participants.contains(&"c".to_owned()));
    assert!(!participants.contains(&"b".to_owned()));

    // 删除后不可见
    let response = client
        .delete(app.http(&format!("/api/v1/chats/{}", chat_id)))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("delete chat");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(app.http(&format!("/api/v1/chats/{}", chat_id)))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("get deleted chat");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
