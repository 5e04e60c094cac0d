// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs commands on the controller host

use super::process::run_to_completion;
use super::{CommandRunner, RunnerError};
use async_trait::async_trait;
use orbit_core::Server;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Runner that executes commands locally, ignoring the target's address.
///
/// Used for single-node clusters where the controller is the node.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalRunner;

impl LocalRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        span: &tracing::Span,
        target: &Server,
        args: &[String],
    ) -> Result<Vec<u8>, RunnerError> {
        let Some((program, rest)) = args.split_first() else {
            return Ok(Vec::new());
        };
        let mut cmd = Command::new(program);
        cmd.args(rest);
        async {
            tracing::debug!(hostname = %target.hostname, ?args, "running locally");
            run_to_completion(cancel, target, program, cmd, None).await
        }
        .instrument(span.clone())
        .await
    }
}
