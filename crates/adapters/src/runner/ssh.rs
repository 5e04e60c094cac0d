// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs commands on nodes over SSH

use super::process::run_to_completion;
use super::{CommandRunner, RunnerError, SSH_CONNECTION_FAILURE};
use async_trait::async_trait;
use orbit_core::{RunnerConfig, Server};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Runner that reaches each node at its advertise address over SSH
#[derive(Clone, Debug)]
pub struct SshRunner {
    program: String,
    options: Vec<String>,
    user: Option<String>,
}

impl Default for SshRunner {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default())
    }
}

impl SshRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: Vec::new(),
            user: None,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            program: config.program.clone(),
            options: config.options.clone(),
            user: config.user.clone(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn destination(&self, target: &Server) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, target.advertise_ip),
            None => target.advertise_ip.clone(),
        }
    }

    /// Full argument vector passed to the SSH program
    pub fn command_line(&self, target: &Server, args: &[String]) -> Vec<String> {
        let mut line = self.options.clone();
        line.push(self.destination(target));
        line.push("--".to_string());
        line.push(shell_join(args));
        line
    }
}

/// Join arguments into one string the remote shell splits back apart
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        span: &tracing::Span,
        target: &Server,
        args: &[String],
    ) -> Result<Vec<u8>, RunnerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.command_line(target, args));
        async {
            tracing::debug!(
                hostname = %target.hostname,
                advertise_ip = %target.advertise_ip,
                ?args,
                "running over ssh"
            );
            run_to_completion(
                cancel,
                target,
                &self.program,
                cmd,
                Some(SSH_CONNECTION_FAILURE),
            )
            .await
        }
        .instrument(span.clone())
        .await
    }
}
