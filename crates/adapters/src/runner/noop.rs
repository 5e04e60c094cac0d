// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op runner for dry runs

use super::{CommandRunner, RunnerError};
use async_trait::async_trait;
use orbit_core::Server;
use tokio_util::sync::CancellationToken;

/// Runner that logs the command and reports success with no output
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpRunner;

impl NoOpRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for NoOpRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        span: &tracing::Span,
        target: &Server,
        args: &[String],
    ) -> Result<Vec<u8>, RunnerError> {
        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled {
                target: target.to_string(),
            });
        }
        span.in_scope(|| tracing::info!(node = %target, ?args, "skipping command (noop runner)"));
        Ok(Vec::new())
    }
}
