// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner selected by configuration at startup

use super::{CommandRunner, LocalRunner, NoOpRunner, RunnerError, SshRunner};
use async_trait::async_trait;
use orbit_core::{RunnerConfig, RunnerKind, Server};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub enum ConfiguredRunner {
    Ssh(SshRunner),
    Local(LocalRunner),
    NoOp(NoOpRunner),
}

impl ConfiguredRunner {
    pub fn from_config(config: &RunnerConfig) -> Self {
        match config.kind {
            RunnerKind::Ssh => Self::Ssh(SshRunner::from_config(config)),
            RunnerKind::Local => Self::Local(LocalRunner::new()),
            RunnerKind::Noop => Self::NoOp(NoOpRunner::new()),
        }
    }

    pub fn kind(&self) -> RunnerKind {
        match self {
            Self::Ssh(_) => RunnerKind::Ssh,
            Self::Local(_) => RunnerKind::Local,
            Self::NoOp(_) => RunnerKind::Noop,
        }
    }
}

#[async_trait]
impl CommandRunner for ConfiguredRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        span: &tracing::Span,
        target: &Server,
        args: &[String],
    ) -> Result<Vec<u8>, RunnerError> {
        match self {
            Self::Ssh(r) => r.run(cancel, span, target, args).await,
            Self::Local(r) => r.run(cancel, span, target, args).await,
            Self::NoOp(r) => r.run(cancel, span, target, args).await,
        }
    }
}
