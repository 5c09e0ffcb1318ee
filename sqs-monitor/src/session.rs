use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{provider::Provider, Result};

/// Resolves and caches the clients of one [`Provider`].
///
/// Configuration, queue client and topic client are each resolved lazily on
/// the calling task the first time they are asked for and reused for the rest
/// of the session's life. A failed resolution is not cached, so a later call
/// tries again.
///
/// There are two ways in:
///
///   * `resolve_*` is the explicit setup path. Failures are returned to the
///     caller, who is expected to abort startup.
///
///   * [`Session::queue_client`] and [`Session::topic_client`] are what the
///     rest of the crate uses on demand. Failures are logged and reported as
///     `None`, which consumers treat as "nothing to do".
pub struct Session<P: Provider> {
    provider: P,
    config: OnceCell<P::Config>,
    queue_client: OnceCell<P::Queue>,
    topic_client: OnceCell<P::Topic>,
}

impl<P: Provider> Session<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: OnceCell::new(),
            queue_client: OnceCell::new(),
            topic_client: OnceCell::new(),
        }
    }

    /// Attaches a caller-supplied configuration, bypassing
    /// [`Provider::load_config`].
    pub fn with_config(mut self, config: P::Config) -> Self {
        self.config = OnceCell::new_with(Some(config));
        self
    }

    /// Attaches a caller-supplied queue client. No configuration is loaded to
    /// use it.
    pub fn with_queue_client(mut self, client: P::Queue) -> Self {
        self.queue_client = OnceCell::new_with(Some(client));
        self
    }

    /// Attaches a caller-supplied topic client. No configuration is loaded to
    /// use it.
    pub fn with_topic_client(mut self, client: P::Topic) -> Self {
        self.topic_client = OnceCell::new_with(Some(client));
        self
    }

    pub async fn resolve_config(&self) -> Result<&P::Config> {
        self.config
            .get_or_try_init(|| async {
                debug!("loading default configuration");
                self.provider.load_config().await
            })
            .await
    }

    pub async fn resolve_queue_client(&self) -> Result<&P::Queue> {
        self.queue_client
            .get_or_try_init(|| async {
                let config = self.resolve_config().await?;
                self.provider.queue_client(config)
            })
            .await
    }

    pub async fn resolve_topic_client(&self) -> Result<&P::Topic> {
        self.topic_client
            .get_or_try_init(|| async {
                let config = self.resolve_config().await?;
                self.provider.topic_client(config)
            })
            .await
    }

    /// Returns the queue client, or `None` if it cannot be resolved.
    pub async fn queue_client(&self) -> Option<&P::Queue> {
        match self.resolve_queue_client().await {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "unable to get queue client from default configuration");
                None
            }
        }
    }

    /// Returns the topic client, or `None` if it cannot be resolved.
    pub async fn topic_client(&self) -> Option<&P::Topic> {
        match self.resolve_topic_client().await {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "unable to get topic client from default configuration");
                None
            }
        }
    }
}
