// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryBackend;
use orbit_core::{Clock, FakeClock, OperationType, Phase, PhaseId, PhaseState};
use std::sync::Arc;

/// Delegates storage but keeps the default conditional append
struct NonAtomic(MemoryBackend);

impl Backend for NonAtomic {
    fn create_operation(&self, operation: &Operation) -> Result<(), StorageError> {
        self.0.create_operation(operation)
    }
    fn get_operation(&self, domain: &str, id: &str) -> Result<Operation, StorageError> {
        self.0.get_operation(domain, id)
    }
    fn get_last_operation(&self) -> Result<Operation, StorageError> {
        self.0.get_last_operation()
    }
    fn update_operation_state(
        &self,
        domain: &str,
        id: &str,
        state: OperationState,
    ) -> Result<Operation, StorageError> {
        self.0.update_operation_state(domain, id, state)
    }
    fn create_operation_plan(&self, plan: &OperationPlan) -> Result<(), StorageError> {
        self.0.create_operation_plan(plan)
    }
    fn get_operation_plan(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<OperationPlan, StorageError> {
        self.0.get_operation_plan(domain, operation_id)
    }
    fn get_operation_plan_changelog(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<Vec<ChangelogEntry>, StorageError> {
        self.0.get_operation_plan_changelog(domain, operation_id)
    }
    fn append_changelog_entry(
        &self,
        entry: ChangelogEntry,
    ) -> Result<ChangelogEntry, StorageError> {
        self.0.append_changelog_entry(entry)
    }
}

fn plan(clock: &FakeClock) -> OperationPlan {
    OperationPlan::new("op-1", OperationType::Install, "example.com", clock.now())
        .with_phases(vec![Phase::new("/init", "Initialize").with_executor("command")])
}

fn no_in_progress(entries: &[ChangelogEntry]) -> bool {
    entries
        .last()
        .map_or(true, |e| e.state != PhaseState::InProgress)
}

#[test]
fn default_conditional_append_honors_guard() {
    let clock = FakeClock::new();
    let backend = NonAtomic(MemoryBackend::new());
    let plan = plan(&clock);
    backend.create_operation_plan(&plan).unwrap();
    assert!(!backend.supports_atomic_append());

    let mark = ChangelogEntry::new(&plan, PhaseId::from("/init"), PhaseState::InProgress, &clock);
    let first = backend
        .append_changelog_entry_if(mark.clone(), &no_in_progress)
        .unwrap();
    assert_eq!(first.unwrap().sequence, 1);

    let second = backend.append_changelog_entry_if(mark, &no_in_progress).unwrap();
    assert!(second.is_none());
    assert_eq!(
        backend
            .get_operation_plan_changelog("example.com", "op-1")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn shared_backend_delegates() {
    let clock = FakeClock::new();
    let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
    let plan = plan(&clock);
    backend.create_operation_plan(&plan).unwrap();
    assert!(backend.supports_atomic_append());

    let entry = ChangelogEntry::new(&plan, PhaseId::from("/init"), PhaseState::Completed, &clock);
    let stored = backend.append_changelog_entry(entry).unwrap();
    assert_eq!(stored.sequence, 1);
    assert_eq!(
        backend.get_operation_plan("example.com", "op-1").unwrap(),
        plan
    );
}
