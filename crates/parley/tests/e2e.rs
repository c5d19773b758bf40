// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over real HTTP: API client -> gateway -> queue -> worker
//! -> poller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_client::{ApiClient, PollConfig, PollOutcome, Poller};
use parley_core::types::Role;
use parley_gateway::{AppState, BillingSettings, build_router};
use parley_pipeline::{FALLBACK_REPLY, Worker};
use parley_test_utils::TestHarness;
use tokio_util::sync::CancellationToken;

struct Running {
    harness: TestHarness,
    base_url: String,
    shutdown: CancellationToken,
}

async fn start(harness: TestHarness) -> Running {
    let state = AppState {
        storage: harness.storage.clone(),
        kv: harness.kv.clone(),
        queue: harness.queue.clone(),
        producer: harness.producer.clone(),
        chatrooms: harness.chatrooms.clone(),
        limiter: harness.limiter.clone(),
        billing: BillingSettings::default(),
        started_at: Instant::now(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    let server_stop = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .with_graceful_shutdown(async move { server_stop.cancelled().await })
            .await
            .unwrap();
    });

    let worker = Worker::new(
        harness.storage.clone(),
        harness.queue.clone(),
        harness.generator.clone(),
    )
    .with_poll_interval(Duration::from_millis(10));
    let worker_stop = shutdown.clone();
    tokio::spawn(async move { worker.run(0, worker_stop).await });

    Running {
        harness,
        base_url: format!("http://{addr}"),
        shutdown,
    }
}

fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(20),
        send_attempts: 200,
        refresh_attempts: 100,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hello_round_trip() {
    let harness = TestHarness::builder()
        .with_replies(vec!["Hello from Parley!".into()])
        .build()
        .await
        .unwrap();
    let running = start(harness).await;

    let mut api = ApiClient::new(&running.base_url, Duration::from_secs(5)).unwrap();
    assert_eq!(api.ping().await.unwrap(), "Parley API");
    api.signup("+15550200").await.unwrap();
    let room = api.create_chatroom("E2E").await.unwrap();
    let queued = api.send_message(room.id, "Hello").await.unwrap();

    let mut poller = Poller::new(api, fast_poll());
    match poller.wait_for_reply(room.id, queued.message_id).await {
        PollOutcome::Replied(reply) => {
            assert_eq!(reply.role, Role::Assistant);
            assert_eq!(reply.content, "Hello from Parley!");
            assert!(reply.id > queued.message_id);
        }
        PollOutcome::StillProcessing => panic!("no reply within the polling window"),
    }

    let requests = running.harness.generator.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].history.is_empty());

    let detail = poller.source().chatroom(room.id).await.unwrap();
    assert_eq!(detail.messages.len(), 2);
    running.shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_generation_still_answers() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.generator.set_failing(true);
    let running = start(harness).await;

    let mut api = ApiClient::new(&running.base_url, Duration::from_secs(5)).unwrap();
    api.signup("+15550201").await.unwrap();
    let room = api.create_chatroom("Flaky").await.unwrap();
    let queued = api.send_message(room.id, "Hello").await.unwrap();

    let mut poller = Poller::new(api, fast_poll());
    match poller.wait_for_reply(room.id, queued.message_id).await {
        PollOutcome::Replied(reply) => assert_eq!(reply.content, FALLBACK_REPLY),
        PollOutcome::StillProcessing => panic!("no reply within the polling window"),
    }
    running.shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn quota_refusal_reaches_the_client() {
    let harness = TestHarness::builder().build().await.unwrap();
    let running = start(harness).await;

    let mut api = ApiClient::new(&running.base_url, Duration::from_secs(5)).unwrap();
    api.signup("+15550202").await.unwrap();
    let room = api.create_chatroom("Limits").await.unwrap();
    for i in 0..5 {
        api.send_message(room.id, &format!("q{i}")).await.unwrap();
    }
    let err = api.send_message(room.id, "q6").await.unwrap_err();
    assert_eq!(err.status(), Some(429));

    let sub = api.subscription().await.unwrap();
    assert_eq!(sub.daily_limit, Some(5));
    running.shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn listings_come_from_cache_until_invalidated() {
    let harness = TestHarness::builder().build().await.unwrap();
    let running = start(harness).await;
    let kv = Arc::clone(&running.harness.kv);

    let mut api = ApiClient::new(&running.base_url, Duration::from_secs(5)).unwrap();
    let signup = api.signup("+15550203").await.unwrap();
    api.create_chatroom("one").await.unwrap();

    assert!(!api.list_chatrooms().await.unwrap().cached);
    assert!(api.list_chatrooms().await.unwrap().cached);
    assert!(
        kv.get(&format!("chatrooms:{}", signup.user_id))
            .await
            .unwrap()
            .is_some()
    );

    api.create_chatroom("two").await.unwrap();
    let listing = api.list_chatrooms().await.unwrap();
    assert!(!listing.cached);
    assert_eq!(listing.chatrooms.len(), 2);
    assert_eq!(listing.chatrooms[0].title, "two");
    running.shutdown.cancel();
}
