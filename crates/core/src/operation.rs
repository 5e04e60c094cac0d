// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster operation records

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of cluster operation a plan drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Install,
    Expand,
    Update,
    Config,
    Shrink,
    Uninstall,
}

impl OperationType {
    pub fn name(&self) -> &'static str {
        match self {
            OperationType::Install => "install",
            OperationType::Expand => "expand",
            OperationType::Update => "update",
            OperationType::Config => "config",
            OperationType::Shrink => "shrink",
            OperationType::Uninstall => "uninstall",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of an operation as a whole
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    #[default]
    InProgress,
    Completed,
    Failed,
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationState::InProgress => "in_progress",
            OperationState::Completed => "completed",
            OperationState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A cluster-level operation; owns exactly one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub site_domain: String,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    #[serde(default)]
    pub state: OperationState,
    pub created: DateTime<Utc>,
}

impl Operation {
    pub fn new(
        id: impl Into<String>,
        site_domain: impl Into<String>,
        operation_type: OperationType,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: id.into(),
            site_domain: site_domain.into(),
            operation_type,
            state: OperationState::InProgress,
            created: clock.now(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state != OperationState::InProgress
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
