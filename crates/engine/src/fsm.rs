// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan state machine
//!
//! Every decision is made against a freshly resolved plan, and every state
//! change is an append to the changelog. Nothing else is persisted, so any
//! number of engines may drive the same operation.

use crate::error::{FsmError, PhaseError};
use crate::executor::{ExecutorParams, ExecutorRegistry, PhaseExecutor, Progress, ProgressSink};
use crate::retry::RetryPolicy;
use futures::stream::{self, StreamExt};
use orbit_adapters::CommandRunner;
use orbit_core::changelog::latest_for;
use orbit_core::{
    resolve_plan, unknown_phases, ChangelogEntry, Clock, EngineConfig, OperationPlan,
    OperationState, Phase, PhaseId, PhaseState,
};
use orbit_storage::Backend;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Engine adapter dependencies
pub struct FsmDeps<B, R, C> {
    pub backend: B,
    pub runner: R,
    pub clock: C,
}

/// Which phase to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseParams {
    pub phase_id: PhaseId,
    /// Skip state and requirement checks
    pub force: bool,
}

impl PhaseParams {
    pub fn new(phase_id: impl Into<PhaseId>) -> Self {
        Self {
            phase_id: phase_id.into(),
            force: false,
        }
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// What a leaf attempt runs and the state it ends in on success
#[derive(Clone, Copy)]
enum Action {
    Execute,
    Rollback,
}

impl Action {
    fn success_state(self) -> PhaseState {
        match self {
            Action::Execute => PhaseState::Completed,
            Action::Rollback => PhaseState::RolledBack,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Action::Execute => "execute",
            Action::Rollback => "roll back",
        }
    }
}

/// Drives one operation's plan
pub struct Fsm<B, R, C> {
    backend: B,
    runner: R,
    clock: C,
    registry: ExecutorRegistry<R>,
    retry: RetryPolicy,
    config: EngineConfig,
    domain: String,
    operation_id: String,
    /// Last resolved plan per operation key; display only
    cache: Mutex<HashMap<String, OperationPlan>>,
    progress_sink: Option<Arc<dyn ProgressSink>>,
}

impl<B, R, C> Fsm<B, R, C>
where
    B: Backend,
    R: CommandRunner,
    C: Clock,
{
    pub fn new(
        deps: FsmDeps<B, R, C>,
        domain: impl Into<String>,
        operation_id: impl Into<String>,
    ) -> Self {
        Self {
            backend: deps.backend,
            runner: deps.runner,
            clock: deps.clock,
            registry: ExecutorRegistry::with_builtin(),
            retry: RetryPolicy::default(),
            config: EngineConfig::default(),
            domain: domain.into(),
            operation_id: operation_id.into(),
            cache: Mutex::new(HashMap::new()),
            progress_sink: None,
        }
    }

    pub fn with_registry(mut self, registry: ExecutorRegistry<R>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    fn key(&self) -> String {
        format!("{}/{}", self.domain, self.operation_id)
    }

    /// Resolve the current plan from the backend and refresh the cache
    pub fn get_plan(&self) -> Result<OperationPlan, FsmError> {
        let base = match self.backend.get_operation_plan(&self.domain, &self.operation_id) {
            Ok(plan) => plan,
            Err(e) if e.is_not_found() => return Err(self.plan_not_found()),
            Err(e) => return Err(e.into()),
        };
        let changelog = self
            .backend
            .get_operation_plan_changelog(&self.domain, &self.operation_id)?;

        let unknown = unknown_phases(&base, &changelog);
        if !unknown.is_empty() {
            tracing::warn!(
                operation_id = %self.operation_id,
                phases = ?unknown,
                "ignoring changelog entries for unknown phases"
            );
        }

        let plan = resolve_plan(&base, &changelog);
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(self.key(), plan.clone());
        Ok(plan)
    }

    /// Plan from the last `get_plan`, without touching the backend
    pub fn cached_plan(&self) -> Option<OperationPlan> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&self.key())
            .cloned()
    }

    fn plan_not_found(&self) -> FsmError {
        match self.backend.get_operation(&self.domain, &self.operation_id) {
            Ok(operation) => FsmError::PlanNotFound {
                operation_type: operation.operation_type,
            },
            Err(_) => FsmError::OperationNotFound(Some(self.operation_id.clone())),
        }
    }

    /// Execute one phase; a composite phase executes its leaves in order
    pub async fn execute_phase(
        &self,
        cancel: &CancellationToken,
        params: PhaseParams,
    ) -> Result<(), FsmError> {
        let plan = self.get_plan()?;
        let phase = find(&plan, &params.phase_id)?;
        if phase.is_leaf() {
            return self.execute_leaf(cancel, &plan, phase, params.force).await;
        }
        if phase.state == PhaseState::Completed && !params.force {
            return Err(FsmError::AlreadyCompleted(phase.id.clone()));
        }

        let leaves: Vec<PhaseId> = phase.leaves().iter().map(|p| p.id.clone()).collect();
        for id in leaves {
            let plan = self.get_plan()?;
            let leaf = find(&plan, &id)?;
            if leaf.state == PhaseState::Completed && !params.force {
                continue;
            }
            self.execute_leaf(cancel, &plan, leaf, params.force).await?;
        }
        Ok(())
    }

    /// Roll back one phase; a composite phase rolls back its leaves in
    /// reverse order
    pub async fn rollback_phase(
        &self,
        cancel: &CancellationToken,
        params: PhaseParams,
    ) -> Result<(), FsmError> {
        let plan = self.get_plan()?;
        let phase = find(&plan, &params.phase_id)?;
        if phase.is_leaf() {
            return self.rollback_leaf(cancel, &plan, phase, params.force).await;
        }

        let leaves: Vec<PhaseId> = phase.leaves().iter().rev().map(|p| p.id.clone()).collect();
        for id in leaves {
            let plan = self.get_plan()?;
            let leaf = find(&plan, &id)?;
            if leaf.state.is_rolled_back_or_unstarted() {
                continue;
            }
            self.rollback_leaf(cancel, &plan, leaf, params.force).await?;
        }
        Ok(())
    }

    /// Execute runnable phases until the plan completes, a phase fails or
    /// nothing can run
    pub async fn execute_plan(&self, cancel: &CancellationToken) -> Result<(), FsmError> {
        loop {
            if cancel.is_cancelled() {
                return Err(FsmError::Cancelled);
            }
            let plan = self.get_plan()?;
            if plan.is_completed() {
                let (done, total) = plan.progress();
                tracing::info!(
                    operation_id = %self.operation_id,
                    done,
                    total,
                    "plan completed"
                );
                return Ok(());
            }

            let runnable: Vec<Phase> = plan.runnable().into_iter().cloned().collect();
            let Some(first) = runnable.first() else {
                let blocked = plan
                    .leaves()
                    .into_iter()
                    .filter(|p| p.state != PhaseState::Completed)
                    .map(|p| p.id.clone())
                    .collect();
                return Err(FsmError::PlanStalled { blocked });
            };

            if self.config.parallelism <= 1 {
                self.execute_leaf(cancel, &plan, first, false).await?;
                continue;
            }

            tracing::debug!(
                phases = runnable.len(),
                parallelism = self.config.parallelism,
                "executing batch"
            );
            let results: Vec<Result<(), FsmError>> = stream::iter(runnable.iter())
                .map(|phase| self.execute_leaf(cancel, &plan, phase, false))
                .buffer_unordered(self.config.parallelism)
                .collect()
                .await;
            for result in results {
                result?;
            }
        }
    }

    /// Drive the plan to the end and record the operation outcome.
    ///
    /// A cancelled run leaves the operation in progress so it can resume,
    /// as does a run blocked by phases another engine holds.
    pub async fn complete(&self, cancel: &CancellationToken) -> Result<(), FsmError> {
        let result = self.execute_plan(cancel).await;
        let state = match &result {
            Ok(()) => Some(OperationState::Completed),
            Err(e) if e.is_cancelled() => None,
            Err(e) if e.is_contended() => {
                tracing::warn!(
                    operation_id = %self.operation_id,
                    error = %e,
                    "plan is held by another run, leaving operation in progress"
                );
                None
            }
            Err(_) => Some(OperationState::Failed),
        };
        let Some(state) = state else {
            return result;
        };

        match self
            .backend
            .update_operation_state(&self.domain, &self.operation_id, state)
        {
            Ok(_) => tracing::info!(
                operation_id = %self.operation_id,
                state = %state,
                "operation finished"
            ),
            Err(e) if result.is_ok() => return Err(e.into()),
            Err(e) => tracing::warn!(error = %e, "failed to record operation state"),
        }
        result
    }

    /// Roll back every executed phase, dependents first
    pub async fn rollback_plan(&self, cancel: &CancellationToken) -> Result<(), FsmError> {
        loop {
            if cancel.is_cancelled() {
                return Err(FsmError::Cancelled);
            }
            let plan = self.get_plan()?;
            let candidates: Vec<&Phase> = plan
                .leaves()
                .into_iter()
                .rev()
                .filter(|p| p.state.is_rollback_eligible())
                .collect();

            if candidates.is_empty() {
                let stuck: Vec<PhaseId> =
                    plan.in_progress().iter().map(|p| p.id.clone()).collect();
                if !stuck.is_empty() {
                    return Err(FsmError::PlanStalled { blocked: stuck });
                }
                tracing::info!(operation_id = %self.operation_id, "plan rolled back");
                return Ok(());
            }

            let next = candidates.iter().find(|p| {
                plan.dependents(&p.id)
                    .iter()
                    .all(|d| d.state.is_rolled_back_or_unstarted())
            });
            let Some(next) = next else {
                let blocked = candidates.iter().map(|p| p.id.clone()).collect();
                return Err(FsmError::PlanStalled { blocked });
            };
            self.rollback_leaf(cancel, &plan, next, false).await?;
        }
    }

    async fn execute_leaf(
        &self,
        cancel: &CancellationToken,
        plan: &OperationPlan,
        phase: &Phase,
        force: bool,
    ) -> Result<(), FsmError> {
        if !force {
            match phase.state {
                PhaseState::Completed => return Err(FsmError::AlreadyCompleted(phase.id.clone())),
                PhaseState::InProgress => {
                    return Err(FsmError::AlreadyInProgress(phase.id.clone()))
                }
                _ => {}
            }
            let unmet = plan.unmet_requirements(&phase.id);
            if !unmet.is_empty() {
                return Err(FsmError::RequirementNotMet {
                    phase: phase.id.clone(),
                    unmet,
                });
            }
        }
        self.attempt(cancel, plan, phase, Action::Execute, force).await
    }

    async fn rollback_leaf(
        &self,
        cancel: &CancellationToken,
        plan: &OperationPlan,
        phase: &Phase,
        force: bool,
    ) -> Result<(), FsmError> {
        if !force {
            if phase.state == PhaseState::InProgress {
                return Err(FsmError::AlreadyInProgress(phase.id.clone()));
            }
            if !phase.state.is_rollback_eligible() {
                return Err(FsmError::InvalidState {
                    phase: phase.id.clone(),
                    state: phase.state,
                    action: Action::Rollback.name(),
                });
            }
            let dependents = active_dependents(plan, &phase.id);
            if !dependents.is_empty() {
                return Err(FsmError::DependencyViolation {
                    phase: phase.id.clone(),
                    dependents,
                });
            }
        }
        self.attempt(cancel, plan, phase, Action::Rollback, force).await
    }

    /// Mark the phase in progress, run it under the retry policy and record
    /// how it ended
    async fn attempt(
        &self,
        cancel: &CancellationToken,
        plan: &OperationPlan,
        phase: &Phase,
        action: Action,
        force: bool,
    ) -> Result<(), FsmError> {
        let span = phase_span(plan, phase);
        let executor = self.build_executor(plan, phase, span.clone())?;
        let observed = phase.state;
        self.mark_in_progress(plan, phase, action, force)?;

        span.in_scope(|| tracing::info!(action = action.name(), "phase started"));
        let start = Instant::now();
        let executor = executor.as_ref();
        let result = self
            .retry
            .run(cancel, phase.id.as_str(), || async move {
                match action {
                    Action::Execute => {
                        executor.pre_check(cancel).await?;
                        executor.execute(cancel).await?;
                        executor.post_check(cancel).await
                    }
                    Action::Rollback => executor.rollback(cancel).await,
                }
            })
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                self.append(plan, phase, action.success_state(), None)?;
                span.in_scope(|| {
                    tracing::info!(action = action.name(), elapsed_ms, "phase finished")
                });
                Ok(())
            }
            Err(e) if e.is_cancelled() => {
                // Back to where it was, unless that was a stale in-progress mark
                let state = match observed {
                    PhaseState::InProgress => PhaseState::Failed,
                    other => other,
                };
                self.append(plan, phase, state, Some("cancelled".to_string()))?;
                span.in_scope(|| {
                    tracing::warn!(action = action.name(), elapsed_ms, "phase cancelled")
                });
                Err(FsmError::Cancelled)
            }
            Err(e) => {
                self.append(plan, phase, PhaseState::Failed, Some(e.to_string()))?;
                span.in_scope(|| {
                    tracing::error!(
                        action = action.name(),
                        elapsed_ms,
                        error = %e,
                        "phase failed"
                    )
                });
                Err(FsmError::PhaseFailed {
                    phase: phase.id.clone(),
                    source: e,
                })
            }
        }
    }

    fn build_executor(
        &self,
        plan: &OperationPlan,
        phase: &Phase,
        span: tracing::Span,
    ) -> Result<Box<dyn PhaseExecutor>, FsmError> {
        let no_executor = || FsmError::NoExecutor {
            phase: phase.id.clone(),
            operation_type: plan.operation_type,
            kind: phase.executor.clone(),
        };
        let kind = phase.executor.as_deref().ok_or_else(no_executor)?;
        let factory = self
            .registry
            .get(plan.operation_type, kind)
            .ok_or_else(no_executor)?;

        let progress = Progress::new(phase, plan.total_steps(), span.clone())
            .with_sink(self.progress_sink.clone());
        let params = ExecutorParams {
            plan: plan.clone(),
            phase: phase.clone(),
            runner: self.runner.clone(),
            progress,
            config: self.config.clone(),
            retry: self.retry.clone(),
            span,
        };
        factory(params).map_err(|e| FsmError::BadParameter {
            phase: phase.id.clone(),
            message: match e {
                PhaseError::BadParameter(message) => message,
                other => other.to_string(),
            },
        })
    }

    /// Compare-and-append the in-progress mark.
    ///
    /// The mark is only written if the phase's authoritative entry is still
    /// the one the decision was based on and, unless forced, the phases it
    /// depends on (or that depend on it, for a rollback) still allow it. A
    /// forced takeover of a phase that is already in progress writes
    /// nothing.
    fn mark_in_progress(
        &self,
        plan: &OperationPlan,
        phase: &Phase,
        action: Action,
        force: bool,
    ) -> Result<(), FsmError> {
        if phase.state == PhaseState::InProgress {
            tracing::warn!(phase = %phase.id, "taking over phase already in progress");
            return Ok(());
        }

        let id = phase.id.clone();
        let observed = phase.sequence.map(|sequence| (phase.state, sequence));
        let recheck = (!force).then(|| plan.clone());
        let guard = move |entries: &[ChangelogEntry]| {
            if latest_for(entries, &id).map(|e| (e.state, e.sequence)) != observed {
                return false;
            }
            let Some(base) = &recheck else {
                return true;
            };
            let current = resolve_plan(base, entries);
            match action {
                Action::Execute => current.unmet_requirements(&id).is_empty(),
                Action::Rollback => active_dependents(&current, &id).is_empty(),
            }
        };
        let entry =
            ChangelogEntry::new(plan, phase.id.clone(), PhaseState::InProgress, &self.clock);
        if self.backend.append_changelog_entry_if(entry, &guard)?.is_some() {
            return Ok(());
        }

        tracing::debug!(phase = %phase.id, "phase changed since the plan was resolved");
        let current = self.get_plan()?;
        match action {
            Action::Execute if !force => {
                let unmet = current.unmet_requirements(&phase.id);
                if !unmet.is_empty() {
                    return Err(FsmError::RequirementNotMet {
                        phase: phase.id.clone(),
                        unmet,
                    });
                }
            }
            Action::Rollback if !force => {
                let dependents = active_dependents(&current, &phase.id);
                if !dependents.is_empty() {
                    return Err(FsmError::DependencyViolation {
                        phase: phase.id.clone(),
                        dependents,
                    });
                }
            }
            _ => {}
        }
        Err(FsmError::AlreadyInProgress(phase.id.clone()))
    }

    fn append(
        &self,
        plan: &OperationPlan,
        phase: &Phase,
        state: PhaseState,
        error: Option<String>,
    ) -> Result<(), FsmError> {
        let mut entry = ChangelogEntry::new(plan, phase.id.clone(), state, &self.clock);
        entry.error = error;
        self.backend.append_changelog_entry(entry)?;
        Ok(())
    }
}

/// Dependents of `id` that have not been rolled back
fn active_dependents(plan: &OperationPlan, id: &PhaseId) -> Vec<PhaseId> {
    plan.dependents(id)
        .into_iter()
        .filter(|d| !d.state.is_rolled_back_or_unstarted())
        .map(|d| d.id.clone())
        .collect()
}

fn find<'a>(plan: &'a OperationPlan, id: &PhaseId) -> Result<&'a Phase, FsmError> {
    plan.find_phase(id)
        .ok_or_else(|| FsmError::PhaseNotFound(id.clone()))
}

fn phase_span(plan: &OperationPlan, phase: &Phase) -> tracing::Span {
    let span = tracing::info_span!(
        "phase",
        phase = %phase.id,
        operation_id = %plan.operation_id,
        advertise_ip = tracing::field::Empty,
        hostname = tracing::field::Empty,
    );
    if let Some(server) = phase.server() {
        span.record("advertise_ip", server.advertise_ip.as_str());
        span.record("hostname", server.hostname.as_str());
    }
    span
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
