//! FCM 适配器的集成测试：对 mock 网关校验请求形状和错误映射。

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use application::notifier::NotificationDispatcher;
use domain::PushNotification;
use infrastructure::{FcmConfig, FcmDispatcher};

fn dispatcher_for(server: &MockServer) -> FcmDispatcher {
    FcmDispatcher::new(FcmConfig {
        endpoint: format!("{}/fcm/send", server.uri()),
        server_key: "secret-key".to_owned(),
    })
}

#[tokio::test]
async fn token_push_carries_registration_ids_and_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(header("Authorization", "key=secret-key"))
        .and(body_partial_json(serde_json::json!({
            "registration_ids": ["tok1", "tok2"],
            "notification": {"title": "Alice Adams", "body": "hi"},
            "data": {"sender": "a"},
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    dispatcher
        .dispatch(PushNotification::to_tokens(
            vec!["tok1".to_owned(), "tok2".to_owned()],
            "a",
            "Alice Adams",
            "hi",
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn topic_push_targets_the_topics_namespace() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(body_partial_json(serde_json::json!({
            "to": "/topics/42",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    dispatcher
        .dispatch(PushNotification::to_topic("42", "a", "Alice Adams", "hello room"))
        .await
        .unwrap();
}

#[tokio::test]
async fn gateway_error_surfaces_as_dispatch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let err = dispatcher
        .dispatch(PushNotification::to_topic("42", "a", "t", "b"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn empty_token_list_is_skipped_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    dispatcher
        .dispatch(PushNotification::to_tokens(vec![], "a", "t", "b"))
        .await
        .unwrap();
}
