// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the plan engine

use orbit_adapters::RunnerError;
use orbit_core::{OperationType, PhaseId, PhaseState, PlanError};
use orbit_storage::StorageError;
use thiserror::Error;

/// Errors returned by phase executors
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Worth retrying: the node was unreachable, a service not yet up
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Failed(String),
    #[error("bad parameter: {0}")]
    BadParameter(String),
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<PhaseError>,
    },
}

impl PhaseError {
    pub fn is_transient(&self) -> bool {
        match self {
            PhaseError::Transient(_) => true,
            PhaseError::Runner(e) => e.is_transient(),
            PhaseError::Context { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            PhaseError::Cancelled => true,
            PhaseError::Runner(e) => e.is_cancelled(),
            PhaseError::Context { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Wrap with a description of what was being attempted
    pub fn context(self, context: impl Into<String>) -> Self {
        PhaseError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Same message, no longer eligible for retry.
    ///
    /// For executors that spend their own retry budget: once it is gone the
    /// caller must not start another round.
    pub fn into_permanent(self) -> Self {
        if self.is_transient() {
            PhaseError::Failed(self.to_string())
        } else {
            self
        }
    }
}

fn join_ids(ids: &[PhaseId]) -> String {
    ids.iter()
        .map(PhaseId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_unmet(unmet: &[(PhaseId, PhaseState)]) -> String {
    unmet
        .iter()
        .map(|(id, state)| format!("{} ({})", id, state))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors returned by the plan engine
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("no operation found{}", .0.as_deref().map(|id| format!(": {}", id)).unwrap_or_default())]
    OperationNotFound(Option<String>),
    #[error("\"{operation_type}\" operation does not have a plan, use 'orbit init' to initialize it")]
    PlanNotFound { operation_type: OperationType },
    #[error("phase {0} not found")]
    PhaseNotFound(PhaseId),
    #[error("phase {phase} requires {} to be completed", join_unmet(.unmet))]
    RequirementNotMet {
        phase: PhaseId,
        unmet: Vec<(PhaseId, PhaseState)>,
    },
    #[error("phase {0} is already completed")]
    AlreadyCompleted(PhaseId),
    #[error("phase {0} is already in progress")]
    AlreadyInProgress(PhaseId),
    #[error("cannot {action} phase {phase} in state {state}")]
    InvalidState {
        phase: PhaseId,
        state: PhaseState,
        action: &'static str,
    },
    #[error("phase {phase}: {message}")]
    BadParameter { phase: PhaseId, message: String },
    #[error("no {} executor for {operation_type} phase {phase}", .kind.as_deref().unwrap_or("<none>"))]
    NoExecutor {
        phase: PhaseId,
        operation_type: OperationType,
        kind: Option<String>,
    },
    #[error("cannot roll back {phase}: roll back {} first", join_ids(.dependents))]
    DependencyViolation {
        phase: PhaseId,
        dependents: Vec<PhaseId>,
    },
    #[error("phase {phase} failed: {source}")]
    PhaseFailed { phase: PhaseId, source: PhaseError },
    #[error("operation cancelled")]
    Cancelled,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("plan cannot progress: {} blocked", join_ids(.blocked))]
    PlanStalled { blocked: Vec<PhaseId> },
    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),
}

impl FsmError {
    pub fn is_not_found(&self) -> bool {
        match self {
            FsmError::OperationNotFound(_) | FsmError::PlanNotFound { .. } => true,
            FsmError::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Rejected before anything was attempted; nothing was recorded
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FsmError::PhaseNotFound(_)
                | FsmError::RequirementNotMet { .. }
                | FsmError::AlreadyCompleted(_)
                | FsmError::AlreadyInProgress(_)
                | FsmError::InvalidState { .. }
                | FsmError::BadParameter { .. }
                | FsmError::NoExecutor { .. }
                | FsmError::DependencyViolation { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FsmError::Cancelled)
    }

    /// Blocked by phases another run holds in progress; says nothing about
    /// whether the operation itself failed
    pub fn is_contended(&self) -> bool {
        matches!(
            self,
            FsmError::AlreadyInProgress(_) | FsmError::PlanStalled { .. }
        )
    }

    /// The phase this error is about, if any
    pub fn phase(&self) -> Option<&PhaseId> {
        match self {
            FsmError::PhaseNotFound(phase)
            | FsmError::AlreadyCompleted(phase)
            | FsmError::AlreadyInProgress(phase) => Some(phase),
            FsmError::RequirementNotMet { phase, .. }
            | FsmError::InvalidState { phase, .. }
            | FsmError::BadParameter { phase, .. }
            | FsmError::NoExecutor { phase, .. }
            | FsmError::DependencyViolation { phase, .. }
            | FsmError::PhaseFailed { phase, .. } => Some(phase),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
