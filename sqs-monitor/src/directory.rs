//! Enumerates the queues and topics visible to a [`Session`].

use tracing::warn;

use crate::{
    pagination::{Page, PageSource, Paginator},
    provider::{Provider, QueueClient, Topic, TopicClient},
    session::Session,
    Result,
};

pub struct QueuePages<'a, Q> {
    client: &'a Q,
}

impl<Q: QueueClient> PageSource for QueuePages<'_, Q> {
    type Item = String;

    fn fetch_page(
        &mut self,
        next_token: Option<String>,
    ) -> impl std::future::Future<Output = Result<Page<String>>> + Send {
        self.client.list_queues_page(next_token)
    }
}

pub struct TopicPages<'a, T> {
    client: &'a T,
}

impl<T: TopicClient> PageSource for TopicPages<'_, T> {
    type Item = Topic;

    fn fetch_page(
        &mut self,
        next_token: Option<String>,
    ) -> impl std::future::Future<Output = Result<Page<Topic>>> + Send {
        self.client.list_topics_page(next_token)
    }
}

/// Lists queue URLs in the order the backend reports them.
///
/// Yields nothing if no queue client can be resolved.
pub async fn list_queues<P: Provider>(session: &Session<P>) -> Paginator<QueuePages<'_, P::Queue>> {
    match session.queue_client().await {
        Some(client) => Paginator::new(QueuePages { client }, "queues"),
        None => Paginator::empty("queues"),
    }
}

/// Lists topics in the order the backend reports them.
///
/// Topics without an ARN are passed through; skipping them is up to the
/// caller.
pub async fn list_topics<P: Provider>(session: &Session<P>) -> Paginator<TopicPages<'_, P::Topic>> {
    match session.topic_client().await {
        Some(client) => Paginator::new(TopicPages { client }, "topics"),
        None => {
            warn!("unable to list topics without a topic client");
            Paginator::empty("topics")
        }
    }
}
