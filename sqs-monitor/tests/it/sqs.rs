//! These tests need the ElasticMQ instance from `testing-docker-compose.yaml`
//! and are ignored by default. Run them with `cargo test -- --ignored`.

use std::sync::Arc;

use aws_sdk_sqs::Client;
use futures_util::StreamExt as _;
use sqs_monitor::{
    backends::{AwsBackend, AwsConfig},
    delete_message, directory, fetch_messages, ActionSpec, PollSettings, Poller, Session,
};

const ROOT_URL: &str = "http://localhost:9324";
const DEFAULT_CFG: [(&str, &str); 3] = [
    ("AWS_DEFAULT_REGION", "localhost"),
    ("AWS_ACCESS_KEY_ID", "x"),
    ("AWS_SECRET_ACCESS_KEY", "x"),
];

/// Creates a temporary queue on the local ElasticMQ instance, so that tests
/// running concurrently do not steal each other's messages, and returns its
/// URL together with a raw client for seeding it.
async fn make_test_queue() -> (String, Client) {
    for (var, val) in &DEFAULT_CFG {
        if std::env::var(var).is_err() {
            std::env::set_var(var, val);
        }
    }

    let config = aws_config::from_env().endpoint_url(ROOT_URL).load().await;
    let client = Client::new(&config);

    let queue_name: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(8)
        .collect();
    let queue_url = client
        .create_queue()
        .queue_name(&queue_name)
        .send()
        .await
        .unwrap()
        .queue_url
        .unwrap();

    (queue_url, client)
}

fn session() -> Session<AwsBackend> {
    Session::new(AwsBackend::new(AwsConfig {
        profile: None,
        endpoint_url: Some(ROOT_URL.to_owned()),
    }))
}

#[tokio::test]
#[ignore = "needs ElasticMQ on localhost:9324"]
async fn test_list_queues() {
    let (queue_url, _client) = make_test_queue().await;
    let session = session();
    session.resolve_queue_client().await.unwrap();

    let queues: Vec<String> = directory::list_queues(&session)
        .await
        .into_stream()
        .collect()
        .await;
    assert!(queues.contains(&queue_url));
}

#[tokio::test]
#[ignore = "needs ElasticMQ on localhost:9324"]
async fn test_fetch_and_delete() {
    let (queue_url, client) = make_test_queue().await;
    client
        .send_message()
        .queue_url(&queue_url)
        .message_body("{\"test\": \"data\"}")
        .send()
        .await
        .unwrap();

    let session = session();
    let mut batch = fetch_messages(&session, &queue_url, 10, 1).await;
    let message = batch.next().await.unwrap();
    assert_eq!(message.body.as_deref(), Some("{\"test\": \"data\"}"));
    assert!(batch.next().await.is_none());

    delete_message(&session, &queue_url, &message).await.unwrap();

    let mut batch = fetch_messages(&session, &queue_url, 10, 1).await;
    assert!(batch.next().await.is_none());
}

#[tokio::test]
#[ignore = "needs ElasticMQ on localhost:9324"]
async fn test_poll_once_drains_the_queue() {
    let (queue_url, client) = make_test_queue().await;
    for body in ["one", "two"] {
        client
            .send_message()
            .queue_url(&queue_url)
            .message_body(body)
            .send()
            .await
            .unwrap();
    }

    let session = Arc::new(session());
    let settings = PollSettings::new(&queue_url).with_wait_seconds(1);
    let poller = Poller::new(session, settings, ActionSpec::parse("cat").unwrap());

    let mut received = 0;
    while received < 2 {
        received += poller.poll_once().await;
    }
    assert_eq!(poller.poll_once().await, 0);
}
