use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::Notify;

use crate::{
    lifecycle::Message,
    pagination::Page,
    provider::{Provider, QueueClient, Topic, TopicClient},
    MonitorError, Result,
};

/// A scripted backend that keeps everything in memory.
///
/// Queue and topic listings are served in pages of a configurable size.
/// Messages are delivered in batches: every receive hands out the next batch
/// queued with [`InMemoryBackend::with_batch`] or [`InMemoryBackend::push_batch`],
/// and waits up to the receive's long-poll time when there is none. Failures
/// can be injected at each step and every call is counted, which makes it a
/// convenient stand-in for a real backend in tests and dry runs.
///
/// Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
    arrivals: Arc<Notify>,
}

#[derive(Debug)]
struct State {
    queues: Vec<String>,
    topics: Vec<Topic>,
    page_size: usize,
    batches: VecDeque<Vec<Message>>,
    next_receipt: usize,
    /// Message ids (or receipt handles, for messages without an id) in the
    /// order they were deleted.
    deleted: Vec<String>,
    receipts: Vec<(String, String)>,

    config_error: Option<String>,
    client_error: Option<String>,
    list_error: Option<(usize, String)>,
    receive_error: Option<String>,
    delete_error: Option<String>,

    config_loads: usize,
    queue_list_calls: usize,
    topic_list_calls: usize,
    receive_calls: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            queues: Vec::new(),
            topics: Vec::new(),
            page_size: 1000,
            batches: VecDeque::new(),
            next_receipt: 0,
            deleted: Vec::new(),
            receipts: Vec::new(),
            config_error: None,
            client_error: None,
            list_error: None,
            receive_error: None,
            delete_error: None,
            config_loads: 0,
            queue_list_calls: 0,
            topic_list_calls: 0,
            receive_calls: 0,
        }
    }
}

impl State {
    fn enqueue(&mut self, batch: Vec<Message>) {
        let batch = batch
            .into_iter()
            .map(|mut message| {
                if message.receipt_handle.is_none() {
                    self.next_receipt += 1;
                    message.receipt_handle = Some(format!("receipt-{}", self.next_receipt));
                }
                if let (Some(receipt), Some(id)) = (&message.receipt_handle, &message.message_id) {
                    self.receipts.push((receipt.clone(), id.clone()));
                }
                message
            })
            .collect();
        self.batches.push_back(batch);
    }

    fn page<T: Clone>(items: &[T], page_size: usize, next_token: Option<String>) -> Result<Page<T>> {
        let start = match next_token {
            Some(token) => token.parse::<usize>().map_err(MonitorError::provider)?,
            None => 0,
        };
        let total = items.len();
        let end = start.saturating_add(page_size.max(1)).min(total);
        let page = items.get(start..end).unwrap_or_default().to_vec();
        let next_token = (end < total).then(|| end.to_string());
        Ok(Page::new(page, next_token))
    }

    fn check_list_error(&self, call: usize) -> Result<()> {
        match &self.list_error {
            Some((at, reason)) if *at == call => Err(MonitorError::Provider(reason.clone().into())),
            _ => Ok(()),
        }
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_queues(self, queues: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.state().queues = queues.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_topics(self, topics: Vec<Topic>) -> Self {
        self.state().topics = topics;
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = page_size;
        self
    }

    /// Queues a batch to be handed out by a later receive. Messages without a
    /// receipt handle get a fresh one.
    pub fn with_batch(self, batch: Vec<Message>) -> Self {
        self.push_batch(batch);
        self
    }

    /// Makes configuration loading fail.
    pub fn with_config_error(self, reason: &str) -> Self {
        self.state().config_error = Some(reason.to_owned());
        self
    }

    /// Makes client construction fail.
    pub fn with_client_error(self, reason: &str) -> Self {
        self.state().client_error = Some(reason.to_owned());
        self
    }

    /// Makes the `call`-th (zero-based) queue or topic listing call fail.
    pub fn with_list_error_at(self, call: usize, reason: &str) -> Self {
        self.state().list_error = Some((call, reason.to_owned()));
        self
    }

    pub fn with_receive_error(self, reason: &str) -> Self {
        self.state().receive_error = Some(reason.to_owned());
        self
    }

    pub fn with_delete_error(self, reason: &str) -> Self {
        self.state().delete_error = Some(reason.to_owned());
        self
    }

    pub fn clear_config_error(&self) {
        self.state().config_error = None;
    }

    /// Queues a batch and wakes up a receive waiting for messages.
    pub fn push_batch(&self, batch: Vec<Message>) {
        self.state().enqueue(batch);
        self.arrivals.notify_one();
    }

    pub fn queue_client(&self) -> InMemoryQueueClient {
        InMemoryQueueClient {
            backend: self.clone(),
        }
    }

    pub fn topic_client(&self) -> InMemoryTopicClient {
        InMemoryTopicClient {
            backend: self.clone(),
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    pub fn pending_batches(&self) -> usize {
        self.state().batches.len()
    }

    pub fn config_loads(&self) -> usize {
        self.state().config_loads
    }

    pub fn queue_list_calls(&self) -> usize {
        self.state().queue_list_calls
    }

    pub fn topic_list_calls(&self) -> usize {
        self.state().topic_list_calls
    }

    pub fn receive_calls(&self) -> usize {
        self.state().receive_calls
    }

    fn take_batch(&self, max_messages: usize) -> Option<Vec<Message>> {
        let mut state = self.state();
        let mut batch = state.batches.pop_front()?;
        if batch.len() > max_messages {
            let rest = batch.split_off(max_messages);
            state.batches.push_front(rest);
        }
        Some(batch)
    }
}

impl Provider for InMemoryBackend {
    type Config = ();

    type Queue = InMemoryQueueClient;
    type Topic = InMemoryTopicClient;

    async fn load_config(&self) -> Result<()> {
        let mut state = self.state();
        state.config_loads += 1;
        match &state.config_error {
            Some(reason) => Err(MonitorError::Configuration(reason.clone())),
            None => Ok(()),
        }
    }

    fn queue_client(&self, _config: &()) -> Result<InMemoryQueueClient> {
        match &self.state().client_error {
            Some(reason) => Err(MonitorError::ClientCreation {
                client: "queue",
                reason: reason.clone(),
            }),
            None => Ok(InMemoryBackend::queue_client(self)),
        }
    }

    fn topic_client(&self, _config: &()) -> Result<InMemoryTopicClient> {
        match &self.state().client_error {
            Some(reason) => Err(MonitorError::ClientCreation {
                client: "topic",
                reason: reason.clone(),
            }),
            None => Ok(InMemoryBackend::topic_client(self)),
        }
    }
}

#[derive(Debug)]
pub struct InMemoryQueueClient {
    backend: InMemoryBackend,
}

impl QueueClient for InMemoryQueueClient {
    async fn list_queues_page(&self, next_token: Option<String>) -> Result<Page<String>> {
        let mut state = self.backend.state();
        let call = state.queue_list_calls;
        state.queue_list_calls += 1;
        state.check_list_error(call)?;
        State::page(&state.queues, state.page_size, next_token)
    }

    async fn receive_messages(
        &self,
        _queue: &str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> Result<Vec<Message>> {
        let max_messages = usize::try_from(max_messages).map_err(MonitorError::provider)?;
        {
            let mut state = self.backend.state();
            state.receive_calls += 1;
            if let Some(reason) = &state.receive_error {
                return Err(MonitorError::Provider(reason.clone().into()));
            }
        }

        if let Some(batch) = self.backend.take_batch(max_messages) {
            return Ok(batch);
        }

        let wait = Duration::from_secs(u64::try_from(wait_seconds).unwrap_or_default());
        let arrived = self.backend.arrivals.notified();
        // Another receive may have been woken instead; an empty batch is fine.
        if tokio::time::timeout(wait, arrived).await.is_ok() {
            return Ok(self.backend.take_batch(max_messages).unwrap_or_default());
        }
        Ok(Vec::new())
    }

    async fn delete_message(&self, _queue: &str, receipt_handle: &str) -> Result<()> {
        let mut state = self.backend.state();
        if let Some(reason) = &state.delete_error {
            return Err(MonitorError::Provider(reason.clone().into()));
        }
        let deleted = state
            .receipts
            .iter()
            .find(|(receipt, _)| receipt == receipt_handle)
            .map_or_else(|| receipt_handle.to_owned(), |(_, id)| id.clone());
        state.deleted.push(deleted);
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryTopicClient {
    backend: InMemoryBackend,
}

impl TopicClient for InMemoryTopicClient {
    async fn list_topics_page(&self, next_token: Option<String>) -> Result<Page<Topic>> {
        let mut state = self.backend.state();
        let call = state.topic_list_calls;
        state.topic_list_calls += 1;
        state.check_list_error(call)?;
        State::page(&state.topics, state.page_size, next_token)
    }
}
