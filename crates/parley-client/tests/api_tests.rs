// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use parley_client::{ApiClient, ClientError, PollConfig, PollOutcome, Poller};
use parley_core::types::Role;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn signup_remembers_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/signup"))
        .and(body_json(json!({"mobile": "+15550100"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "message": "User created",
            "data": {"user_id": 1, "token": "abc123"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "message": "ok",
            "data": {"user": {"id": 1, "mobile": "+15550100", "tier": "basic",
                              "created_at": "2026-01-01T00:00:00.000Z"}}
        })))
        .mount(&server)
        .await;

    let mut api = client(&server);
    let signup = api.signup("+15550100").await.unwrap();
    assert_eq!(signup.user_id, 1);
    assert_eq!(api.token(), Some("abc123"));
    assert_eq!(api.me().await.unwrap().mobile, "+15550100");
}

#[tokio::test]
async fn protected_calls_need_a_token() {
    let server = MockServer::start().await;
    let api = client(&server);
    assert!(matches!(api.list_chatrooms().await, Err(ClientError::NoToken)));
}

#[tokio::test]
async fn error_envelope_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chatroom/3/message"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "ok": false,
            "message": "Daily prompt limit of 5 reached. Upgrade to Pro for unlimited prompts.",
            "data": null
        })))
        .mount(&server)
        .await;

    let api = client(&server).with_token("t");
    let err = api.send_message(3, "hi").await.unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(err.to_string().contains("Upgrade to Pro"));
}

#[tokio::test]
async fn listing_reports_cache_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chatroom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "message": "ok (cache)",
            "data": {"chatrooms": [{"id": 2, "title": "b", "created_at": "2026-01-02T00:00:00.000Z"}]}
        })))
        .mount(&server)
        .await;

    let listing = client(&server).with_token("t").list_chatrooms().await.unwrap();
    assert!(listing.cached);
    assert_eq!(listing.chatrooms[0].title, "b");
}

#[tokio::test]
async fn poller_reads_detail_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chatroom/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "message": "ok",
            "data": {"chatroom": {
                "id": 1, "title": "a", "created_at": "2026-01-01T00:00:00.000Z",
                "messages": [
                    {"id": 10, "role": "user", "content": "Hello", "created_at": "2026-01-01T00:00:01.000Z"},
                    {"id": 11, "role": "assistant", "content": "Hi!", "created_at": "2026-01-01T00:00:02.000Z"}
                ]
            }}
        })))
        .mount(&server)
        .await;

    let mut poller = Poller::new(
        client(&server).with_token("t"),
        PollConfig {
            interval: Duration::from_millis(10),
            send_attempts: 3,
            refresh_attempts: 3,
        },
    );
    match poller.wait_for_reply(1, 10).await {
        PollOutcome::Replied(reply) => {
            assert_eq!(reply.id, 11);
            assert_eq!(reply.role, Role::Assistant);
            assert_eq!(reply.content, "Hi!");
        }
        PollOutcome::StillProcessing => panic!("reply not found"),
    }
}

#[tokio::test]
async fn subscribe_pro_returns_checkout_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/subscribe/pro"))
        .and(header("authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "message": "Checkout created",
            "data": {"checkout_url": "https://pay.example.com/pro?client_reference_id=4"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server).with_token("t");
    assert_eq!(
        api.subscribe_pro().await.unwrap(),
        "https://pay.example.com/pro?client_reference_id=4"
    );
}
