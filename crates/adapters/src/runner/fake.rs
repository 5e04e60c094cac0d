// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake command runner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CommandRunner, RunnerError, SSH_CONNECTION_FAILURE};
use async_trait::async_trait;
use orbit_core::Server;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Recorded runner call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCall {
    pub hostname: String,
    pub advertise_ip: String,
    pub args: Vec<String>,
}

impl RunnerCall {
    /// Arguments joined with spaces
    pub fn command(&self) -> String {
        self.args.join(" ")
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(Vec<u8>),
    Exit { code: i32, output: String },
    Connection(String),
    Hang,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<RunnerCall>,
    script: VecDeque<Scripted>,
    fallback: Option<Scripted>,
    delay: Option<Duration>,
}

/// Fake runner with scripted responses.
///
/// Each call takes the next scripted response; once the script is empty the
/// fallback applies, which defaults to success with no output.
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_output(&self, output: impl Into<Vec<u8>>) {
        self.lock().script.push_back(Scripted::Output(output.into()));
    }

    /// Next call exits non-zero
    pub fn push_failure(&self, code: i32, output: impl Into<String>) {
        self.lock().script.push_back(Scripted::Exit {
            code,
            output: output.into(),
        });
    }

    /// Next call fails as if the node were unreachable
    pub fn push_connection_failure(&self, output: impl Into<String>) {
        self.lock()
            .script
            .push_back(Scripted::Connection(output.into()));
    }

    /// Next call blocks until cancelled
    pub fn push_hang(&self) {
        self.lock().script.push_back(Scripted::Hang);
    }

    /// Every unscripted call exits non-zero
    pub fn fail_always(&self, code: i32, output: impl Into<String>) {
        self.lock().fallback = Some(Scripted::Exit {
            code,
            output: output.into(),
        });
    }

    /// Every unscripted call fails to connect
    pub fn fail_always_connection(&self) {
        self.lock().fallback = Some(Scripted::Connection("connection refused".to_string()));
    }

    /// Every unscripted call blocks until cancelled
    pub fn hang_always(&self) {
        self.lock().fallback = Some(Scripted::Hang);
    }

    /// Every call takes at least `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RunnerCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        span: &tracing::Span,
        target: &Server,
        args: &[String],
    ) -> Result<Vec<u8>, RunnerError> {
        let (response, delay) = {
            let mut state = self.lock();
            state.calls.push(RunnerCall {
                hostname: target.hostname.clone(),
                advertise_ip: target.advertise_ip.clone(),
                args: args.to_vec(),
            });
            let response = state
                .script
                .pop_front()
                .or_else(|| state.fallback.clone())
                .unwrap_or(Scripted::Output(Vec::new()));
            (response, state.delay)
        };
        span.in_scope(|| tracing::debug!(node = %target, ?args, "fake run"));

        let cancelled = || RunnerError::Cancelled {
            target: target.to_string(),
        };
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match response {
            Scripted::Output(output) => Ok(output),
            Scripted::Exit { code, output } => Err(RunnerError::Exit {
                target: target.to_string(),
                code: Some(code),
                output,
                connection: false,
            }),
            Scripted::Connection(output) => Err(RunnerError::Exit {
                target: target.to_string(),
                code: Some(SSH_CONNECTION_FAILURE),
                output,
                connection: true,
            }),
            Scripted::Hang => {
                cancel.cancelled().await;
                Err(cancelled())
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
