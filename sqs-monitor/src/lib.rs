//! # sqs-monitor
//!
//! sqs-monitor watches a queue and runs an external action for every message
//! that arrives:
//!
//!   * The body of each message is written to the action's standard input
//!
//!   * Every dispatched message is deleted from the queue afterwards, whether
//!     the action succeeded or not
//!
//!   * The queues and topics visible to the ambient configuration can be
//!     listed
//!
//! ## Cargo Features
//!
//! Each backend is enabled with its associated cargo feature. Both are enabled
//! by default:
//!
//! * `aws`: Amazon SQS for queues, Amazon SNS for topics
//! * `in_memory`: a scripted backend useful for tests and dry runs
//!
//! ## How to Use sqs-monitor
//!
//! Everything starts from a [`Session`], which resolves backend clients lazily
//! the first time they are needed and reuses them afterwards:
//!
//! ```no_run
//! # async {
//! use std::sync::Arc;
//!
//! use sqs_monitor::{
//!     backends::aws::{AwsBackend, AwsConfig},
//!     ActionSpec, PollSettings, Poller, Session,
//! };
//!
//! let session = Session::new(AwsBackend::new(AwsConfig::default()));
//!
//! // Explicit setup is loud: a missing region or credentials aborts here.
//! session.resolve_queue_client().await?;
//!
//! let settings = PollSettings::new("https://sqs.eu-west-1.amazonaws.com/123456789012/jobs");
//! let action = ActionSpec::parse("./handle-job.sh --verbose")?;
//!
//! Poller::new(Arc::new(session), settings, action)
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # anyhow::Ok(())
//! # };
//! ```
//!
//! Listing is lazy: pages are only requested as items are consumed.
//!
//! ```no_run
//! # async {
//! # use sqs_monitor::{backends::aws::{AwsBackend, AwsConfig}, directory, Session};
//! # let session = Session::new(AwsBackend::new(AwsConfig::default()));
//! let mut queues = directory::list_queues(&session).await;
//! while let Some(queue_url) = queues.next().await {
//!     println!("{queue_url}");
//! }
//! # anyhow::Ok(())
//! # };
//! ```
#![warn(unreachable_pub)]

use std::{io, process::ExitStatus};

use thiserror::Error;

pub mod action;
pub mod backends;
pub mod directory;
pub mod lifecycle;
pub mod pagination;
pub mod poller;
pub mod provider;
pub mod session;

pub use self::{
    action::{ActionSpec, Dispatch},
    lifecycle::{delete_message, fetch_messages, Message},
    pagination::{Page, PageSource, Paginator},
    poller::{PollSettings, Poller, PollerHandle},
    provider::{Provider, QueueClient, Topic, TopicClient},
    session::Session,
};

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("unable to load configuration: {0}")]
    Configuration(String),

    #[error("unable to create {client} client: {reason}")]
    ClientCreation {
        client: &'static str,
        reason: String,
    },

    #[error("unable to acquire a queue client")]
    ClientUnavailable,

    #[error("message has no receipt handle")]
    MissingReceiptHandle,

    #[error("failed to remove message: {0}")]
    Delete(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("must specify an action")]
    EmptyAction,

    #[error("unable to start `{command}`: {source}")]
    ActionLaunch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited unsuccessfully: {status}")]
    ActionFailed { command: String, status: ExitStatus },

    #[error("poller task did not finish cleanly")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Provider(Box<dyn std::error::Error + Send + Sync>),
}

impl MonitorError {
    pub fn provider<E: 'static + std::error::Error + Send + Sync>(e: E) -> Self {
        Self::Provider(Box::new(e))
    }

    pub(crate) fn delete(e: MonitorError) -> Self {
        match e {
            e @ Self::Delete(_) => e,
            e => Self::Delete(Box::new(e)),
        }
    }
}
