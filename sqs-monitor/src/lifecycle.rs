use tracing::debug;

use crate::{
    pagination::{Page, PageSource, Paginator},
    provider::{Provider, QueueClient},
    session::Session,
    MonitorError, Result,
};

/// A message received from a queue.
///
/// It only lives for one receive, dispatch and delete cycle. The receipt
/// handle proves this particular receive and is what deletion needs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    pub message_id: Option<String>,
    pub body: Option<String>,
    pub receipt_handle: Option<String>,
}

impl Message {
    pub fn new(message_id: impl Into<String>, body: Option<&str>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            body: body.map(ToOwned::to_owned),
            receipt_handle: None,
        }
    }

    pub fn with_receipt_handle(mut self, receipt_handle: impl Into<String>) -> Self {
        self.receipt_handle = Some(receipt_handle.into());
        self
    }

    pub fn id(&self) -> &str {
        self.message_id.as_deref().unwrap_or("<unknown>")
    }
}

/// A single receive call, presented as a one-page listing.
pub struct ReceiveBatch<'a, Q> {
    client: &'a Q,
    queue: &'a str,
    max_messages: i32,
    wait_seconds: i32,
}

impl<Q: QueueClient> PageSource for ReceiveBatch<'_, Q> {
    type Item = Message;

    async fn fetch_page(&mut self, _next_token: Option<String>) -> Result<Page<Message>> {
        let messages = self
            .client
            .receive_messages(self.queue, self.max_messages, self.wait_seconds)
            .await?;
        debug!(queue = self.queue, count = messages.len(), "received messages");
        Ok(Page::last(messages))
    }
}

/// Receives at most `max_messages` messages from `queue`, long-polling for up
/// to `wait_seconds`.
///
/// This issues a single receive call; callers loop to keep polling. Without a
/// queue client, or when the receive fails, nothing is yielded and the
/// failure is only logged.
pub async fn fetch_messages<'a, P: Provider>(
    session: &'a Session<P>,
    queue: &'a str,
    max_messages: i32,
    wait_seconds: i32,
) -> Paginator<ReceiveBatch<'a, P::Queue>> {
    match session.queue_client().await {
        Some(client) => Paginator::new(
            ReceiveBatch {
                client,
                queue,
                max_messages,
                wait_seconds,
            },
            "messages",
        ),
        None => Paginator::empty("messages"),
    }
}

/// Removes `message` from `queue` using its receipt handle.
///
/// Unlike [`fetch_messages`], a missing client is reported: the caller is
/// holding a message it cannot acknowledge and should know about it.
pub async fn delete_message<P: Provider>(
    session: &Session<P>,
    queue: &str,
    message: &Message,
) -> Result<()> {
    let client = session
        .queue_client()
        .await
        .ok_or(MonitorError::ClientUnavailable)?;
    let receipt_handle = message
        .receipt_handle
        .as_deref()
        .ok_or(MonitorError::MissingReceiptHandle)?;

    client
        .delete_message(queue, receipt_handle)
        .await
        .map_err(MonitorError::delete)?;
    debug!(queue, message_id = message.id(), "removed message");
    Ok(())
}

#[cfg(all(test, feature = "in_memory"))]
mod tests {
    use super::{delete_message, fetch_messages, Message};
    use crate::{backends::in_memory::InMemoryBackend, MonitorError, Session};

    const QUEUE: &str = "memory://jobs";

    async fn drain(session: &Session<InMemoryBackend>, max: i32) -> Vec<Message> {
        let mut batch = fetch_messages(session, QUEUE, max, 0).await;
        let mut out = Vec::new();
        while let Some(message) = batch.next().await {
            out.push(message);
        }
        out
    }

    #[tokio::test]
    async fn yields_one_batch_in_order() {
        let backend = InMemoryBackend::new()
            .with_batch(vec![
                Message::new("m1", Some("a")),
                Message::new("m2", Some("b")),
            ])
            .with_batch(vec![Message::new("m3", Some("c"))]);
        let session = Session::new(backend.clone());

        let ids: Vec<_> = drain(&session, 10).await.iter().map(|m| m.id().to_owned()).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert_eq!(backend.receive_calls(), 1);

        let ids: Vec<_> = drain(&session, 10).await.iter().map(|m| m.id().to_owned()).collect();
        assert_eq!(ids, ["m3"]);
        assert_eq!(backend.receive_calls(), 2);
    }

    #[tokio::test]
    async fn honours_max_messages() {
        let backend = InMemoryBackend::new().with_batch(vec![
            Message::new("m1", Some("a")),
            Message::new("m2", Some("b")),
            Message::new("m3", Some("c")),
        ]);
        let session = Session::new(backend);

        assert_eq!(drain(&session, 2).await.len(), 2);
        assert_eq!(drain(&session, 2).await.len(), 1);
    }

    #[tokio::test]
    async fn receive_failure_yields_nothing() {
        let backend = InMemoryBackend::new()
            .with_batch(vec![Message::new("m1", Some("a"))])
            .with_receive_error("queue does not exist");
        let session = Session::new(backend.clone());

        assert!(drain(&session, 10).await.is_empty());
        assert_eq!(backend.receive_calls(), 1);
    }

    #[tokio::test]
    async fn missing_client_yields_nothing() {
        let backend = InMemoryBackend::new()
            .with_batch(vec![Message::new("m1", Some("a"))])
            .with_config_error("no credentials found");
        let session = Session::new(backend.clone());

        assert!(drain(&session, 10).await.is_empty());
        assert_eq!(backend.receive_calls(), 0);
    }

    #[tokio::test]
    async fn delete_uses_the_receipt_handle() {
        let backend = InMemoryBackend::new().with_batch(vec![Message::new("m1", Some("a"))]);
        let session = Session::new(backend.clone());

        let message = drain(&session, 10).await.remove(0);
        delete_message(&session, QUEUE, &message).await.unwrap();

        assert_eq!(backend.deleted(), ["m1"]);
    }

    #[tokio::test]
    async fn delete_without_client_is_an_error() {
        let backend = InMemoryBackend::new().with_config_error("no credentials found");
        let session = Session::new(backend);
        let message = Message::new("m1", Some("a")).with_receipt_handle("r1");

        let err = delete_message(&session, QUEUE, &message).await.unwrap_err();
        assert!(matches!(err, MonitorError::ClientUnavailable));
    }

    #[tokio::test]
    async fn delete_without_receipt_handle_is_an_error() {
        let session = Session::new(InMemoryBackend::new());
        let message = Message::new("m1", Some("a"));

        let err = delete_message(&session, QUEUE, &message).await.unwrap_err();
        assert!(matches!(err, MonitorError::MissingReceiptHandle));
    }

    #[tokio::test]
    async fn provider_delete_failure_is_surfaced() {
        let backend = InMemoryBackend::new()
            .with_batch(vec![Message::new("m1", Some("a"))])
            .with_delete_error("receipt handle has expired");
        let session = Session::new(backend.clone());

        let message = drain(&session, 10).await.remove(0);
        let err = delete_message(&session, QUEUE, &message).await.unwrap_err();

        assert!(matches!(err, MonitorError::Delete(_)));
        assert!(backend.deleted().is_empty());
    }
}
