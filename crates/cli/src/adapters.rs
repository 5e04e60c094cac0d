// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine factory for CLI commands

use anyhow::{Context, Result};
use orbit_adapters::{ConfiguredRunner, TracedRunner};
use orbit_core::{Config, Operation, SystemClock};
use orbit_engine::{Fsm, FsmDeps, RetryPolicy};
use orbit_storage::FileBackend;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::output::ConsoleProgress;

pub type StateBackend = Arc<FileBackend>;
pub type Runner = TracedRunner<ConfiguredRunner>;
pub type Engine = Fsm<StateBackend, Runner, SystemClock>;

pub fn open_backend(state_dir: &Path) -> Result<StateBackend> {
    let backend = FileBackend::open(state_dir)
        .with_context(|| format!("failed to open state directory {}", state_dir.display()))?;
    Ok(Arc::new(backend))
}

/// Production engine for `operation`, configured from `config`
pub fn make_engine(config: &Config, backend: StateBackend, operation: &Operation) -> Engine {
    let runner = TracedRunner::new(ConfiguredRunner::from_config(&config.runner));
    Fsm::new(
        FsmDeps {
            backend,
            runner,
            clock: SystemClock,
        },
        &operation.site_domain,
        &operation.id,
    )
    .with_retry(RetryPolicy::from_config(&config.retry))
    .with_config(config.engine.clone())
    .with_progress_sink(Arc::new(ConsoleProgress))
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_interrupt() -> Result<CancellationToken> {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, stopping the current phase...");
        token.cancel();
    })?;
    Ok(cancel)
}
