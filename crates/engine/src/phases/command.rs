// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs shell commands bound to the phase on its server
//!
//! Phase details:
//!
//! ```text
//! command   run on execute (required)
//! rollback  run on rollback; rollback is a no-op without it
//! check     run before execute; a non-zero exit fails the pre-check
//! ```

use crate::error::PhaseError;
use crate::executor::{ExecutorParams, PhaseExecutor, Progress};
use async_trait::async_trait;
use orbit_adapters::CommandRunner;
use orbit_core::Server;
use tokio_util::sync::CancellationToken;

pub struct CommandExecutor<R> {
    server: Server,
    command: String,
    rollback: Option<String>,
    check: Option<String>,
    description: String,
    runner: R,
    progress: Progress,
    span: tracing::Span,
}

impl<R: CommandRunner> CommandExecutor<R> {
    pub fn new(params: ExecutorParams<R>) -> Result<Self, PhaseError> {
        let server = params.server()?.clone();
        let command = params.require_detail("command")?.to_string();
        let description = if params.phase.description.is_empty() {
            format!("Run {}", command)
        } else {
            params.phase.description.clone()
        };
        Ok(Self {
            server,
            rollback: params.phase.detail("rollback").map(str::to_string),
            check: params.phase.detail("check").map(str::to_string),
            command,
            description,
            runner: params.runner,
            progress: params.progress,
            span: params.span,
        })
    }

    async fn sh(&self, cancel: &CancellationToken, script: &str) -> Result<(), PhaseError> {
        let args = shell_args(script);
        self.runner
            .run(cancel, &self.span, &self.server, &args)
            .await?;
        Ok(())
    }
}

fn shell_args(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

#[async_trait]
impl<R: CommandRunner> PhaseExecutor for CommandExecutor<R> {
    async fn pre_check(&self, cancel: &CancellationToken) -> Result<(), PhaseError> {
        match &self.check {
            Some(check) => self
                .sh(cancel, check)
                .await
                .map_err(|e| e.context("pre-check failed")),
            None => Ok(()),
        }
    }

    async fn execute(&self, cancel: &CancellationToken) -> Result<(), PhaseError> {
        self.progress.next_step(self.description.clone());
        self.sh(cancel, &self.command).await
    }

    async fn rollback(&self, cancel: &CancellationToken) -> Result<(), PhaseError> {
        let Some(rollback) = &self.rollback else {
            return Ok(());
        };
        self.progress
            .next_step(format!("Roll back: {}", self.description));
        self.sh(cancel, rollback).await
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
