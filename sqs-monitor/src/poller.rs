use std::{future::Future, sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    action::Dispatch,
    lifecycle::{delete_message, fetch_messages, Message},
    provider::Provider,
    session::Session,
    Result,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollSettings {
    pub queue: String,
    /// Upper bound on the messages handed out by one receive.
    pub max_messages: i32,
    /// Server-side long-poll wait of one receive.
    pub wait_seconds: i32,
    /// Pause before the next receive when one fails or no client is available.
    pub retry_delay: Duration,
}

impl PollSettings {
    pub const DEFAULT_MAX_MESSAGES: i32 = 10;
    pub const DEFAULT_WAIT_SECONDS: i32 = 10;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            max_messages: Self::DEFAULT_MAX_MESSAGES,
            wait_seconds: Self::DEFAULT_WAIT_SECONDS,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_max_messages(mut self, max_messages: i32) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_wait_seconds(mut self, wait_seconds: i32) -> Self {
        self.wait_seconds = wait_seconds;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Receives messages from one queue, dispatches each body to an action and
/// deletes the message afterwards.
///
/// Messages are handled one at a time. Deletion happens once per dispatched
/// message whatever the action's outcome, and a failed delete is logged
/// without retrying the action. Messages without a body are neither
/// dispatched nor deleted.
pub struct Poller<P: Provider, D> {
    session: Arc<Session<P>>,
    settings: PollSettings,
    dispatcher: D,
}

impl<P: Provider, D: Dispatch> Poller<P, D> {
    pub fn new(session: Arc<Session<P>>, settings: PollSettings, dispatcher: D) -> Self {
        Self {
            session,
            settings,
            dispatcher,
        }
    }

    /// Polls until `shutdown` is cancelled.
    ///
    /// Cancellation is only looked at between batches: a receive that is
    /// long-polling and the handling of every message it returned complete
    /// first. After a failed receive, or when no client is available, the
    /// next one waits for the retry delay unless `shutdown` fires meanwhile.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(queue = %self.settings.queue, "monitoring queue");
        while !shutdown.is_cancelled() {
            let batch = self.poll_batch().await;
            if batch.degraded {
                debug!(delay = ?self.settings.retry_delay, "receive failed, backing off");
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(self.settings.retry_delay) => {}
                }
            }
        }
        info!(queue = %self.settings.queue, "stopped monitoring queue");
    }

    /// Receives one batch and handles every message in it. Returns the number
    /// of messages received.
    pub async fn poll_once(&self) -> usize {
        self.poll_batch().await.received
    }

    async fn poll_batch(&self) -> BatchOutcome {
        let PollSettings {
            queue,
            max_messages,
            wait_seconds,
            ..
        } = &self.settings;

        let mut batch =
            fetch_messages(self.session.as_ref(), queue, *max_messages, *wait_seconds).await;
        let mut received = 0;
        while let Some(message) = batch.next().await {
            received += 1;
            self.handle(message).await;
        }
        BatchOutcome {
            received,
            degraded: batch.is_degraded(),
        }
    }

    async fn handle(&self, message: Message) {
        println!("Message arrived.");
        let Some(body) = message.body.as_deref() else {
            warn!(message_id = message.id(), "message has no body, leaving it on the queue");
            return;
        };

        if let Err(e) = self.dispatcher.dispatch(body).await {
            debug!(message_id = message.id(), error = %e, "action failed");
        }

        let deleted = delete_message(self.session.as_ref(), &self.settings.queue, &message).await;
        if let Err(e) = deleted {
            error!(message_id = message.id(), error = %e, "failed to remove message");
        }
    }
}

struct BatchOutcome {
    received: usize,
    degraded: bool,
}

impl<P, D> Poller<P, D>
where
    P: Provider + 'static,
    D: Dispatch + 'static,
{
    /// Starts polling on a background task.
    pub fn spawn(self) -> PollerHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { self.run(shutdown).await }
        });
        PollerHandle { shutdown, task }
    }

    /// Polls in the background until `signal` resolves, then waits for the
    /// current batch to be finished.
    pub async fn run_until(self, signal: impl Future<Output = ()>) -> Result<()> {
        let handle = self.spawn();
        signal.await;
        info!("interrupt received, finishing the current batch");
        handle.stop().await
    }
}

/// Handle to a [`Poller`] running on a background task.
pub struct PollerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the poller to stop and waits for it to do so.
    ///
    /// There is no timeout: if a receive is long-polling, this waits for it.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.task.await?;
        Ok(())
    }
}
