use std::sync::{Arc, Mutex};

use futures_util::StreamExt as _;
use sqs_monitor::{
    backends::InMemoryBackend, delete_message, directory, fetch_messages, ActionSpec, Dispatch,
    Message, MonitorError, PollSettings, Poller, Result, Session, Topic,
};
use tokio_util::sync::CancellationToken;

const QUEUE: &str = "memory://orders";

/// Records every dispatched body and stops the poller after a given one.
struct Recorder {
    backend: InMemoryBackend,
    dispatched: Mutex<Vec<String>>,
    stop_after: String,
    shutdown: CancellationToken,
}

impl Dispatch for Recorder {
    async fn dispatch(&self, body: &str) -> Result<()> {
        assert!(
            !self.backend.deleted().iter().any(|id| id == body),
            "{body} was deleted before it was dispatched"
        );
        self.dispatched.lock().unwrap().push(body.to_owned());
        if body == self.stop_after {
            self.shutdown.cancel();
        }
        Ok(())
    }
}

fn message(id: &str) -> Message {
    Message::new(id, Some(id))
}

#[tokio::test]
async fn two_batches_with_a_bodiless_message() {
    let backend = InMemoryBackend::new()
        .with_batch(vec![message("m1"), message("m2"), message("m3")])
        .with_batch(vec![Message::new("m4", None), message("m5")]);
    let shutdown = CancellationToken::new();
    let recorder = Arc::new(Recorder {
        backend: backend.clone(),
        dispatched: Mutex::new(Vec::new()),
        stop_after: "m5".to_owned(),
        shutdown: shutdown.clone(),
    });

    let session = Arc::new(Session::new(backend.clone()));
    let settings = PollSettings::new(QUEUE).with_wait_seconds(1);
    Poller::new(session, settings, recorder.clone())
        .run(shutdown)
        .await;

    assert_eq!(*recorder.dispatched.lock().unwrap(), ["m1", "m2", "m3", "m5"]);
    assert_eq!(backend.deleted(), ["m1", "m2", "m3", "m5"]);
    assert_eq!(backend.receive_calls(), 2);
}

#[tokio::test]
async fn spawned_poller_finishes_its_batch_on_stop() {
    let backend = InMemoryBackend::new();
    let shutdown_after_first = CancellationToken::new();
    let recorder = Arc::new(Recorder {
        backend: backend.clone(),
        dispatched: Mutex::new(Vec::new()),
        stop_after: "a".to_owned(),
        shutdown: shutdown_after_first.clone(),
    });

    let session = Arc::new(Session::new(backend.clone()));
    let settings = PollSettings::new(QUEUE).with_wait_seconds(5);
    let handle = Poller::new(session, settings, recorder.clone()).spawn();

    // The poller is long-polling an empty queue; a batch arriving wakes it up.
    backend.push_batch(vec![message("a"), message("b"), message("c")]);
    shutdown_after_first.cancelled().await;
    handle.stop().await.unwrap();

    assert_eq!(*recorder.dispatched.lock().unwrap(), ["a", "b", "c"]);
    assert_eq!(backend.deleted(), ["a", "b", "c"]);
}

#[tokio::test]
async fn listing_and_deleting_without_configuration() {
    let backend = InMemoryBackend::new()
        .with_queues(["memory://a", "memory://b"])
        .with_topics(vec![Topic::new("arn:aws:sns:eu-west-1:000000000000:alerts")])
        .with_config_error("no credentials found");
    let session = Session::new(backend.clone());

    let queues: Vec<String> = directory::list_queues(&session)
        .await
        .into_stream()
        .collect()
        .await;
    assert!(queues.is_empty());

    let topics: Vec<Topic> = directory::list_topics(&session)
        .await
        .into_stream()
        .collect()
        .await;
    assert!(topics.is_empty());

    let mut batch = fetch_messages(&session, QUEUE, 10, 0).await;
    assert!(batch.next().await.is_none());

    let held = Message::new("m1", Some("x")).with_receipt_handle("r1");
    assert!(matches!(
        delete_message(&session, QUEUE, &held).await,
        Err(MonitorError::ClientUnavailable)
    ));
}

#[tokio::test]
async fn listing_is_complete_and_ordered() {
    let queues: Vec<String> = (0..25).map(|i| format!("memory://queue-{i:02}")).collect();
    let backend = InMemoryBackend::new()
        .with_queues(queues.clone())
        .with_page_size(10);
    let session = Session::new(backend.clone());

    let listed: Vec<String> = directory::list_queues(&session)
        .await
        .into_stream()
        .collect()
        .await;

    assert_eq!(listed, queues);
    assert_eq!(backend.queue_list_calls(), 3);
}

#[tokio::test]
async fn topics_without_arn_are_left_to_the_caller() {
    let backend = InMemoryBackend::new()
        .with_topics(vec![
            Topic::new("arn:aws:sns:eu-west-1:000000000000:a"),
            Topic::default(),
            Topic::new("arn:aws:sns:eu-west-1:000000000000:b"),
        ])
        .with_page_size(1);
    let session = Session::new(backend.clone());

    let arns: Vec<String> = directory::list_topics(&session)
        .await
        .into_stream()
        .filter_map(|topic| async move { topic.topic_arn })
        .collect()
        .await;

    assert_eq!(
        arns,
        [
            "arn:aws:sns:eu-west-1:000000000000:a",
            "arn:aws:sns:eu-west-1:000000000000:b"
        ]
    );
    assert_eq!(backend.topic_list_calls(), 3);
}

#[cfg(unix)]
#[tokio::test]
async fn messages_are_deleted_whatever_the_action_does() {
    for command_line in ["cat", "false", "/nonexistent/sqs-monitor-action"] {
        let backend = InMemoryBackend::new().with_batch(vec![message("m1")]);
        let session = Arc::new(Session::new(backend.clone()));
        let settings = PollSettings::new(QUEUE).with_wait_seconds(0);
        let action = ActionSpec::parse(command_line).unwrap();

        let received = Poller::new(session, settings, action).poll_once().await;

        assert_eq!(received, 1, "{command_line}");
        assert_eq!(backend.deleted(), ["m1"], "{command_line}");
    }
}
