mod common;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{active_cloud, task};
use httpmock::Method::{DELETE, GET, PATCH, POST};
use httpmock::MockServer;
use rose_core::models::{ChatMessage, CloudConfig, Task};
use rose_core::sync::{FetchOutcome, PushOutcome, Remote, RemoteClient, Resource, SyncError};
use serde_json::json;

fn client() -> RemoteClient {
    RemoteClient::new(Duration::from_secs(5)).unwrap()
}

fn cloud_for(server: &MockServer) -> CloudConfig {
    // Trailing slash is trimmed before building paths
    CloudConfig::new(format!("{}/", server.base_url()), "anon-key", true)
}

#[tokio::test]
async fn fetch_tasks_sends_auth_headers() {
    let server = MockServer::start_async().await;
    let t1 = task("T1");
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/tasks")
                .query_param("select", "*")
                .header("apikey", "anon-key")
                .header("authorization", "Bearer anon-key");
            then.status(200).json_body(json!([t1]));
        })
        .await;

    let outcome: FetchOutcome<Task> = client()
        .fetch_collection(&cloud_for(&server), Resource::Tasks)
        .await;

    mock.assert_hits_async(1).await;
    match outcome {
        FetchOutcome::Records(tasks) => assert_eq!(tasks, vec![t1]),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn fetch_messages_orders_by_timestamp() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/messages")
                .query_param("select", "*")
                .query_param("order", "timestamp.asc");
            then.status(200).json_body(json!([ChatMessage::system_greeting()]));
        })
        .await;

    let outcome = client()
        .fetch::<ChatMessage>(&cloud_for(&server))
        .await;

    mock.assert_hits_async(1).await;
    assert_eq!(
        outcome.into_records(),
        Some(vec![ChatMessage::system_greeting()])
    );
}

#[tokio::test]
async fn empty_remote_is_distinct_from_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/tasks");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/messages");
            then.status(401).body("{\"message\":\"Invalid API key\"}");
        })
        .await;

    let cloud = cloud_for(&server);
    let tasks: FetchOutcome<Task> = client().fetch_collection(&cloud, Resource::Tasks).await;
    let messages: FetchOutcome<ChatMessage> =
        client().fetch_collection(&cloud, Resource::Messages).await;

    assert!(matches!(tasks, FetchOutcome::Empty));
    match messages {
        FetchOutcome::Failed(SyncError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_a_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/tasks");
            then.status(200).json_body(json!({ "not": "a list" }));
        })
        .await;

    let outcome: FetchOutcome<Task> = client()
        .fetch_collection(&cloud_for(&server), Resource::Tasks)
        .await;

    assert!(matches!(outcome, FetchOutcome::Failed(SyncError::Decode(_))));
    assert!(outcome.into_records().is_none());
}

#[tokio::test]
async fn unreachable_server_is_a_failure() {
    let server = MockServer::start_async().await;
    let cloud = cloud_for(&server);
    drop(server);

    let outcome: FetchOutcome<Task> = client().fetch_collection(&cloud, Resource::Tasks).await;
    assert!(outcome.is_failed());
}

#[tokio::test]
async fn push_posts_record_with_minimal_return() {
    let server = MockServer::start_async().await;
    let t1 = task("T1");
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/tasks")
                .header("apikey", "anon-key")
                .header("authorization", "Bearer anon-key")
                .header("content-type", "application/json")
                .header("prefer", "return=minimal")
                .json_body(json!(t1));
            then.status(201);
        })
        .await;

    let outcome = client().create(&cloud_for(&server), &t1).await;

    mock.assert_hits_async(1).await;
    assert_eq!(outcome, PushOutcome::Pushed);
}

#[tokio::test]
async fn message_push_body_matches_shared_schema() {
    let server = MockServer::start_async().await;
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 0).unwrap();
    let msg = ChatMessage::at("RoseOps", "Operasyon", "Hazırız", at);
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/messages")
                .json_body(json!({
                    "id": msg.id,
                    "sender": "RoseOps",
                    "content": "Hazırız",
                    "timestamp": "09:05",
                    "channel": "Operasyon"
                }));
            then.status(201);
        })
        .await;

    let outcome = client().create(&cloud_for(&server), &msg).await;

    mock.assert_hits_async(1).await;
    assert_eq!(outcome, PushOutcome::Pushed);
}

#[tokio::test]
async fn message_push_carries_sent_at_when_enabled() {
    let server = MockServer::start_async().await;
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 0).unwrap();
    let msg = ChatMessage::at("RoseOps", "Operasyon", "Hazırız", at);
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/messages")
                .json_body(json!({
                    "id": msg.id,
                    "sender": "RoseOps",
                    "content": "Hazırız",
                    "timestamp": "09:05",
                    "channel": "Operasyon",
                    "sentAt": at.timestamp_millis()
                }));
            then.status(201);
        })
        .await;

    let outcome = client()
        .with_sent_at(true)
        .create(&cloud_for(&server), &msg)
        .await;

    mock.assert_hits_async(1).await;
    assert_eq!(outcome, PushOutcome::Pushed);
}

#[tokio::test]
async fn push_failure_is_reported_not_raised() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/messages");
            then.status(500).body("boom");
        })
        .await;

    let msg = ChatMessage::new("RoseOps", "Genel", "test");
    let outcome = client()
        .push_record(&cloud_for(&server), Resource::Messages, &msg)
        .await;

    assert!(matches!(outcome, PushOutcome::Failed(reason) if reason.contains("500")));
}

#[tokio::test]
async fn update_and_delete_filter_by_id() {
    let server = MockServer::start_async().await;
    let t1 = task("T1");
    let filter = format!("eq.{}", t1.id);
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/tasks")
                .query_param("id", filter.as_str())
                .header("prefer", "return=minimal")
                .json_body(json!(t1));
            then.status(204);
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/tasks")
                .query_param("id", filter.as_str())
                .header("apikey", "anon-key");
            then.status(204);
        })
        .await;

    let cloud = cloud_for(&server);
    assert_eq!(client().update(&cloud, &t1).await, PushOutcome::Pushed);
    assert_eq!(
        client().delete::<Task>(&cloud, &t1.id).await,
        PushOutcome::Pushed
    );

    patch.assert_hits_async(1).await;
    delete.assert_hits_async(1).await;
}

#[tokio::test]
async fn disabled_config_never_reaches_server() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.path_contains("/rest/v1/");
            then.status(200).json_body(json!([]));
        })
        .await;

    let mut cloud = cloud_for(&server);
    cloud.enabled = false;

    let fetched: FetchOutcome<Task> = client().fetch_collection(&cloud, Resource::Tasks).await;
    let pushed = client().create(&cloud, &task("T1")).await;

    assert!(matches!(fetched, FetchOutcome::Disabled));
    assert_eq!(pushed, PushOutcome::Skipped);
    any.assert_hits_async(0).await;

    // Sanity check that the helper config is otherwise usable
    assert!(active_cloud().is_active());
}
