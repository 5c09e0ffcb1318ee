use clap::{Args, Parser, Subcommand};
use sqs_monitor::{backends::AwsConfig, PollSettings};

/// Monitors an SQS queue, running an action for every message that arrives
#[derive(Debug, Parser)]
#[command(name = "sqs-monitor", version)]
pub(crate) struct Cli {
    /// Named AWS profile to use instead of the default one
    #[arg(long, global = true)]
    pub(crate) profile: Option<String>,

    /// Endpoint override, e.g. http://localhost:9324 for ElasticMQ
    #[arg(long, global = true, env = "SQS_MONITOR_ENDPOINT_URL")]
    pub(crate) endpoint_url: Option<String>,

    /// Logging level, RUST_LOG takes precedence when set
    #[arg(long, global = true, default_value = "info")]
    pub(crate) log_level: String,

    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Cli {
    pub(crate) fn aws_config(&self) -> AwsConfig {
        AwsConfig {
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Monitors a queue, executing an action for every incoming message.
    ///
    /// The body of the message is passed to the action on its standard input.
    /// The message is removed from the queue once the action has run, whether
    /// it succeeded or not.
    Monitor(MonitorArgs),

    /// Lists queues or topics
    List {
        #[command(subcommand)]
        what: ListCommand,
    },
}

#[derive(Debug, Args)]
pub(crate) struct MonitorArgs {
    /// The queue to monitor
    #[arg(long, env = "SQS_MONITOR_QUEUE")]
    pub(crate) queue: String,

    /// The action to run, e.g. "jq -r .detail"
    #[arg(long, env = "SQS_MONITOR_ACTION")]
    pub(crate) action: String,

    /// Maximum number of messages to retrieve at a time
    #[arg(
        long,
        alias = "maxMessage",
        env = "SQS_MONITOR_MAX_MESSAGES",
        default_value_t = PollSettings::DEFAULT_MAX_MESSAGES,
        value_parser = clap::value_parser!(i32).range(1..=10),
    )]
    pub(crate) max_messages: i32,

    /// Maximum time to wait for messages, in seconds, before trying again
    #[arg(
        long,
        alias = "waitSeconds",
        env = "SQS_MONITOR_WAIT_SECONDS",
        default_value_t = PollSettings::DEFAULT_WAIT_SECONDS,
        value_parser = clap::value_parser!(i32).range(0..=20),
    )]
    pub(crate) wait_seconds: i32,
}

impl MonitorArgs {
    pub(crate) fn poll_settings(&self) -> PollSettings {
        PollSettings::new(&self.queue)
            .with_max_messages(self.max_messages)
            .with_wait_seconds(self.wait_seconds)
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum ListCommand {
    /// Lists the SQS queues available to the current profile
    Queues(ListArgs),
    /// Lists the SNS topics available to the current profile
    Topics(ListArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Print a JSON array instead of one entry per line
    #[arg(long)]
    pub(crate) json: bool,
}
