// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! Engine errors are mapped to:
//! - What went wrong (message)
//! - Why it might have happened (context)
//! - How to fix it (suggestions)

use orbit_engine::FsmError;
use std::fmt;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct OrbitError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl OrbitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Describe an engine error for the terminal
    pub fn from_fsm(err: &FsmError) -> Self {
        let error = OrbitError::new(err.to_string());
        match err {
            FsmError::OperationNotFound(_) => error
                .with_context("No operation has been initialized in this state directory")
                .with_suggestion("Initialize one from a plan file: orbit init <plan-file>"),
            FsmError::PlanNotFound { .. } => {
                error.with_suggestion("Initialize the plan: orbit init <plan-file>")
            }
            FsmError::PhaseNotFound(_) => {
                error.with_suggestion("List phases and their states: orbit plan")
            }
            FsmError::RequirementNotMet { unmet, .. } => {
                let mut error = error;
                for (phase, _) in unmet {
                    error = error
                        .with_suggestion(format!("Execute it first: orbit plan execute {}", phase));
                }
                error
            }
            FsmError::AlreadyCompleted(phase) => error.with_suggestion(format!(
                "Run it again anyway: orbit plan execute {} --force",
                phase
            )),
            FsmError::AlreadyInProgress(phase) => error
                .with_context("Another controller may be running this phase")
                .with_suggestion("Wait for it to finish, then check: orbit plan")
                .with_suggestion(format!(
                    "If that controller is gone, take over: orbit plan execute {} --force",
                    phase
                )),
            FsmError::DependencyViolation { dependents, .. } => {
                let mut error = error;
                for phase in dependents {
                    error = error.with_suggestion(format!("orbit plan rollback {}", phase));
                }
                error
            }
            FsmError::PhaseFailed { phase, .. } => error
                .with_context("The failure was recorded; the phase can be retried")
                .with_suggestion(format!("Retry the phase: orbit plan execute {}", phase))
                .with_suggestion(format!("Undo it: orbit plan rollback {}", phase)),
            FsmError::PlanStalled { .. } => error
                .with_context("Phases left in progress by an interrupted controller block the plan")
                .with_suggestion("Inspect the plan: orbit plan")
                .with_suggestion("Take over a stuck phase: orbit plan execute <phase> --force"),
            FsmError::Cancelled => {
                error.with_suggestion("Resume where it stopped: orbit plan resume")
            }
            _ => error,
        }
    }
}

impl fmt::Display for OrbitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for OrbitError {}

impl From<FsmError> for OrbitError {
    fn from(err: FsmError) -> Self {
        OrbitError::from_fsm(&err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
