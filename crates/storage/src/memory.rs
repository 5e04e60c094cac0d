// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend

use crate::backend::{AppendGuard, Backend};
use crate::error::StorageError;
use crate::state::{MaterializedState, Record};
use orbit_core::{ChangelogEntry, Operation, OperationPlan, OperationState};
use std::sync::{Arc, Mutex, MutexGuard};

/// Backend holding everything in process memory.
///
/// Clones share the same state. Conditional appends are atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MaterializedState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MaterializedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current state
    pub fn state(&self) -> MaterializedState {
        self.lock().clone()
    }
}

fn append(
    state: &mut MaterializedState,
    mut entry: ChangelogEntry,
) -> Result<ChangelogEntry, StorageError> {
    entry.sequence = state.next_sequence();
    state.apply(&Record::ChangelogAppended {
        entry: entry.clone(),
    })?;
    Ok(entry)
}

impl Backend for MemoryBackend {
    fn create_operation(&self, operation: &Operation) -> Result<(), StorageError> {
        self.lock().apply(&Record::OperationCreated {
            operation: operation.clone(),
        })
    }

    fn get_operation(&self, domain: &str, id: &str) -> Result<Operation, StorageError> {
        self.lock()
            .operation(domain, id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("operation", format!("{}/{}", domain, id)))
    }

    fn get_last_operation(&self) -> Result<Operation, StorageError> {
        self.lock()
            .last_operation()
            .cloned()
            .ok_or_else(|| StorageError::not_found("operation", "last"))
    }

    fn update_operation_state(
        &self,
        domain: &str,
        id: &str,
        state: OperationState,
    ) -> Result<Operation, StorageError> {
        let mut guard = self.lock();
        guard.apply(&Record::OperationStateChanged {
            domain: domain.to_string(),
            id: id.to_string(),
            state,
        })?;
        guard
            .operation(domain, id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("operation", format!("{}/{}", domain, id)))
    }

    fn create_operation_plan(&self, plan: &OperationPlan) -> Result<(), StorageError> {
        self.lock().apply(&Record::PlanCreated { plan: plan.clone() })
    }

    fn get_operation_plan(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<OperationPlan, StorageError> {
        self.lock()
            .plan(domain, operation_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("plan", format!("{}/{}", domain, operation_id)))
    }

    fn get_operation_plan_changelog(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<Vec<ChangelogEntry>, StorageError> {
        Ok(self.lock().changelog(domain, operation_id).to_vec())
    }

    fn append_changelog_entry(
        &self,
        entry: ChangelogEntry,
    ) -> Result<ChangelogEntry, StorageError> {
        append(&mut self.lock(), entry)
    }

    fn append_changelog_entry_if(
        &self,
        entry: ChangelogEntry,
        guard: AppendGuard<'_>,
    ) -> Result<Option<ChangelogEntry>, StorageError> {
        let mut state = self.lock();
        if !guard(state.changelog(&entry.domain, &entry.operation_id)) {
            return Ok(None);
        }
        append(&mut state, entry).map(Some)
    }

    fn supports_atomic_append(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
