// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase executors and the registry that builds them

use crate::error::PhaseError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use orbit_adapters::CommandRunner;
use orbit_core::{EngineConfig, OperationPlan, OperationType, Phase, PhaseId, Server};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// The work behind one leaf phase.
///
/// The engine always calls `pre_check`, `execute` and `post_check` in that
/// order (or `rollback` alone), so no-op implementations are fine.
#[async_trait]
pub trait PhaseExecutor: Send + Sync {
    async fn pre_check(&self, _cancel: &CancellationToken) -> Result<(), PhaseError> {
        Ok(())
    }

    async fn execute(&self, cancel: &CancellationToken) -> Result<(), PhaseError>;

    async fn post_check(&self, _cancel: &CancellationToken) -> Result<(), PhaseError> {
        Ok(())
    }

    async fn rollback(&self, cancel: &CancellationToken) -> Result<(), PhaseError>;
}

/// A step reported by a running executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub phase: PhaseId,
    pub step: u32,
    pub total: u32,
    pub message: String,
}

/// Receives step reports, e.g. to print them to a terminal
pub trait ProgressSink: Send + Sync {
    fn report(&self, step: &StepReport);
}

/// Handle executors use to announce what they are doing
#[derive(Clone)]
pub struct Progress {
    phase: PhaseId,
    step: u32,
    total: u32,
    span: tracing::Span,
    steps: Arc<Mutex<Vec<String>>>,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl Progress {
    pub fn new(phase: &Phase, total: u32, span: tracing::Span) -> Self {
        Self {
            phase: phase.id.clone(),
            step: phase.step,
            total,
            span,
            steps: Arc::new(Mutex::new(Vec::new())),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Option<Arc<dyn ProgressSink>>) -> Self {
        self.sink = sink;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn next_step(&self, message: impl Into<String>) {
        let message = message.into();
        self.span.in_scope(|| {
            tracing::info!(step = self.step, total = self.total, "{}", message);
        });
        if let Some(sink) = &self.sink {
            sink.report(&StepReport {
                phase: self.phase.clone(),
                step: self.step,
                total: self.total,
                message: message.clone(),
            });
        }
        self.lock().push(message);
    }

    /// Messages reported so far
    pub fn steps(&self) -> Vec<String> {
        self.lock().clone()
    }
}

/// Everything an executor factory gets to build an executor
pub struct ExecutorParams<R> {
    /// Resolved plan at the time the phase was picked up
    pub plan: OperationPlan,
    pub phase: Phase,
    pub runner: R,
    pub progress: Progress,
    pub config: EngineConfig,
    pub retry: RetryPolicy,
    /// Carries phase, operation and server fields
    pub span: tracing::Span,
}

impl<R> ExecutorParams<R> {
    /// The server the phase is bound to
    pub fn server(&self) -> Result<&Server, PhaseError> {
        self.phase
            .server()
            .ok_or_else(|| PhaseError::BadParameter("server is required".to_string()))
    }

    pub fn require_detail(&self, key: &str) -> Result<&str, PhaseError> {
        self.phase
            .detail(key)
            .ok_or_else(|| PhaseError::BadParameter(format!("{} is required", key)))
    }
}

pub type ExecutorFactory<R> =
    Arc<dyn Fn(ExecutorParams<R>) -> Result<Box<dyn PhaseExecutor>, PhaseError> + Send + Sync>;

/// Executor factories keyed by operation type and executor kind.
///
/// A factory registered for a specific operation type wins over one
/// registered for every type.
pub struct ExecutorRegistry<R> {
    factories: HashMap<(Option<OperationType>, String), ExecutorFactory<R>>,
}

impl<R> Clone for ExecutorRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<R> Default for ExecutorRegistry<R> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<R: CommandRunner> ExecutorRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the executors that ship with orbit
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::phases::register_builtin(&mut registry);
        registry
    }

    /// Register `factory` for `kind` under every operation type
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(ExecutorParams<R>) -> Result<Box<dyn PhaseExecutor>, PhaseError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert((None, kind.into()), Arc::new(factory));
        self
    }

    pub fn register_for<F>(
        &mut self,
        operation_type: OperationType,
        kind: impl Into<String>,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(ExecutorParams<R>) -> Result<Box<dyn PhaseExecutor>, PhaseError>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert((Some(operation_type), kind.into()), Arc::new(factory));
        self
    }

    pub fn get(&self, operation_type: OperationType, kind: &str) -> Option<ExecutorFactory<R>> {
        self.factories
            .get(&(Some(operation_type), kind.to_string()))
            .or_else(|| self.factories.get(&(None, kind.to_string())))
            .cloned()
    }

    /// Registered kinds, sorted and deduplicated
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().map(|(_, k)| k.clone()).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
