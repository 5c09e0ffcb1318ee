use std::{fmt, future::Future, io, process::Stdio, sync::Arc};

use tokio::{io::AsyncWriteExt as _, process::Command};
use tracing::{debug, warn};

use crate::{MonitorError, Result};

/// Runs the configured action for one message body.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, body: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<D: Dispatch> Dispatch for Arc<D> {
    fn dispatch(&self, body: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).dispatch(body)
    }
}

/// An external command together with its arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionSpec {
    pub command: String,
    pub args: Vec<String>,
}

impl ActionSpec {
    pub fn new(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits an action command line on whitespace. The first word is the
    /// command, the rest are its arguments. No shell quoting is interpreted.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace();
        let command = words.next().ok_or(MonitorError::EmptyAction)?;
        Ok(Self::new(command, words))
    }

    async fn run(&self, body: &str) -> Result<()> {
        let launch_error = |source: io::Error| MonitorError::ActionLaunch {
            command: self.to_string(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            // The action may exit without reading all of its input.
            match stdin.write_all(body.as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!(command = %self, "action closed its input early");
                }
                Err(e) => warn!(command = %self, error = %e, "unable to write message body"),
            }
        }

        let status = child.wait().await.map_err(launch_error)?;
        if status.success() {
            Ok(())
        } else {
            Err(MonitorError::ActionFailed {
                command: self.to_string(),
                status,
            })
        }
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl Dispatch for ActionSpec {
    async fn dispatch(&self, body: &str) -> Result<()> {
        println!("running: {}", self.command);
        println!("===============");
        let result = self.run(body).await;
        println!("\n===============");
        match &result {
            Ok(()) => println!("command finished"),
            Err(e) => println!("{}", failure_line(self, e)),
        }
        result
    }
}

fn failure_line(action: &ActionSpec, error: &MonitorError) -> String {
    format!("failed to run [{action}]: {error}")
}
