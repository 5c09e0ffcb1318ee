use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use sqs_monitor::{backends::AwsBackend, directory, ActionSpec, Poller, Session};
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

mod cli;

use self::cli::{Cli, Command, ListArgs, ListCommand, MonitorArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let session = Session::new(AwsBackend::new(cli.aws_config()));
    match cli.command {
        Command::Monitor(args) => monitor(session, args).await,
        Command::List {
            what: ListCommand::Queues(args),
        } => list_queues(&session, args).await,
        Command::List {
            what: ListCommand::Topics(args),
        } => list_topics(&session, args).await,
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn monitor(session: Session<AwsBackend>, args: MonitorArgs) -> anyhow::Result<()> {
    let action = ActionSpec::parse(&args.action)?;
    session
        .resolve_queue_client()
        .await
        .context("unable to set up the SQS client")?;

    Poller::new(Arc::new(session), args.poll_settings(), action)
        .run_until(interrupted())
        .await?;
    Ok(())
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "unable to listen for interrupts, stopping");
    }
}

async fn list_queues(session: &Session<AwsBackend>, args: ListArgs) -> anyhow::Result<()> {
    let mut queues = directory::list_queues(session).await;
    if args.json {
        let mut all = Vec::new();
        while let Some(queue) = queues.next().await {
            all.push(queue);
        }
        println!("{}", serde_json::to_string_pretty(&all)?);
    } else {
        while let Some(queue) = queues.next().await {
            println!("{queue}");
        }
    }
    Ok(())
}

async fn list_topics(session: &Session<AwsBackend>, args: ListArgs) -> anyhow::Result<()> {
    let mut topics = directory::list_topics(session).await;
    if args.json {
        let mut all = Vec::new();
        while let Some(topic) = topics.next().await {
            if topic.topic_arn.is_some() {
                all.push(topic);
            }
        }
        println!("{}", serde_json::to_string_pretty(&all)?);
    } else {
        while let Some(topic) = topics.next().await {
            if let Some(arn) = topic.topic_arn {
                println!("{arn}");
            }
        }
    }
    Ok(())
}
