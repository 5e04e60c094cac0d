// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced runner wrapper for consistent observability

use crate::runner::{CommandRunner, RunnerError};
use async_trait::async_trait;
use orbit_core::Server;
use tokio_util::sync::CancellationToken;

/// Wrapper that adds a span and timing to any CommandRunner
#[derive(Clone)]
pub struct TracedRunner<R> {
    inner: R,
}

impl<R> TracedRunner<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: CommandRunner> CommandRunner for TracedRunner<R> {
    async fn run(
        &self,
        cancel: &CancellationToken,
        span: &tracing::Span,
        target: &Server,
        args: &[String],
    ) -> Result<Vec<u8>, RunnerError> {
        let span = tracing::info_span!(
            parent: span,
            "runner.run",
            hostname = %target.hostname,
            advertise_ip = %target.advertise_ip,
        );
        span.in_scope(|| tracing::info!(command = %args.join(" "), "starting"));

        let start = std::time::Instant::now();
        let result = self.inner.run(cancel, &span, target, args).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        span.in_scope(|| match &result {
            Ok(output) => tracing::info!(elapsed_ms, output_len = output.len(), "command finished"),
            Err(e) if e.is_cancelled() => tracing::warn!(elapsed_ms, "command cancelled"),
            Err(e) => tracing::error!(
                elapsed_ms,
                transient = e.is_transient(),
                error = %e,
                "command failed"
            ),
        });

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
