use std::future::Future;

use serde::Serialize;

use crate::{lifecycle::Message, pagination::Page, Result};

/// A topic descriptor as reported by the backend.
///
/// The ARN is optional because the backend's payload makes no guarantee it is
/// present; callers that print topics skip the ones without it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Topic {
    pub topic_arn: Option<String>,
}

impl Topic {
    pub fn new(topic_arn: impl Into<String>) -> Self {
        Self {
            topic_arn: Some(topic_arn.into()),
        }
    }
}

pub trait QueueClient: Send + Sync {
    fn list_queues_page(
        &self,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<String>>> + Send;

    /// Receives at most `max_messages` messages, waiting server-side for up to
    /// `wait_seconds` for at least one to arrive.
    fn receive_messages(
        &self,
        queue: &str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    fn delete_message(
        &self,
        queue: &str,
        receipt_handle: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

pub trait TopicClient: Send + Sync {
    fn list_topics_page(
        &self,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<Topic>>> + Send;
}

/// Turns ambient configuration into ready-to-use clients.
///
/// This trait is meant to be implemented once per backend and handed to a
/// [`Session`][crate::Session], which takes care of caching what it returns.
pub trait Provider: Send + Sync {
    type Config: Send + Sync;

    type Queue: QueueClient;
    type Topic: TopicClient;

    /// Loads the backend configuration from the environment and provider
    /// defaults. Fails with [`MonitorError::Configuration`][crate::MonitorError]
    /// when nothing usable is found.
    fn load_config(&self) -> impl Future<Output = Result<Self::Config>> + Send;

    fn queue_client(&self, config: &Self::Config) -> Result<Self::Queue>;

    fn topic_client(&self, config: &Self::Config) -> Result<Self::Topic>;
}
