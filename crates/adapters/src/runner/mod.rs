// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command runners: how phase commands reach cluster nodes

mod configured;
mod local;
mod noop;
mod process;
mod ssh;

pub use configured::ConfiguredRunner;
pub use local::LocalRunner;
pub use noop::NoOpRunner;
pub use ssh::SshRunner;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRunner, RunnerCall};

use async_trait::async_trait;
use orbit_core::Server;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// SSH reserves this exit status for its own connection failures
pub const SSH_CONNECTION_FAILURE: i32 = 255;

/// Errors from running a command on a node
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start {program} for {target}: {source}")]
    Spawn {
        target: String,
        program: String,
        source: std::io::Error,
    },
    #[error("command on {target} exited with {}: {output}", exit_status(*.code))]
    Exit {
        target: String,
        code: Option<i32>,
        /// Combined stderr and stdout
        output: String,
        /// The transport failed rather than the command
        connection: bool,
    },
    #[error("command on {target} was cancelled")]
    Cancelled { target: String },
}

fn exit_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl RunnerError {
    /// Connection-level failures are worth retrying; command failures are not
    pub fn is_transient(&self) -> bool {
        match self {
            RunnerError::Spawn { .. } => true,
            RunnerError::Exit { connection, .. } => *connection,
            RunnerError::Cancelled { .. } => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunnerError::Cancelled { .. })
    }

    /// Raw command output, when the command ran
    pub fn output(&self) -> Option<&str> {
        match self {
            RunnerError::Exit { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Runs a command on a cluster node.
///
/// `args` is the argument vector, not a shell string. Implementations stop
/// the in-flight command when `cancel` fires and log under `span`.
#[async_trait]
pub trait CommandRunner: Clone + Send + Sync + 'static {
    async fn run(
        &self,
        cancel: &CancellationToken,
        span: &tracing::Span,
        target: &Server,
        args: &[String],
    ) -> Result<Vec<u8>, RunnerError>;
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
