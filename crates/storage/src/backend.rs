// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend trait shared by every store

use crate::error::StorageError;
use orbit_core::{ChangelogEntry, Operation, OperationPlan, OperationState};

/// Decides whether a conditional append may proceed, given the plan's
/// current changelog
pub type AppendGuard<'a> = &'a (dyn Fn(&[ChangelogEntry]) -> bool + Send + Sync);

/// Durable storage for operations, base plans and changelogs.
///
/// Changelogs are append-only: no method edits or removes an entry.
pub trait Backend: Send + Sync {
    fn create_operation(&self, operation: &Operation) -> Result<(), StorageError>;

    fn get_operation(&self, domain: &str, id: &str) -> Result<Operation, StorageError>;

    /// Most recently created operation
    fn get_last_operation(&self) -> Result<Operation, StorageError>;

    fn update_operation_state(
        &self,
        domain: &str,
        id: &str,
        state: OperationState,
    ) -> Result<Operation, StorageError>;

    /// Store the base plan; fails if the operation already has one
    fn create_operation_plan(&self, plan: &OperationPlan) -> Result<(), StorageError>;

    fn get_operation_plan(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<OperationPlan, StorageError>;

    fn get_operation_plan_changelog(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<Vec<ChangelogEntry>, StorageError>;

    /// Append an entry; returns it with its assigned sequence
    fn append_changelog_entry(&self, entry: ChangelogEntry) -> Result<ChangelogEntry, StorageError>;

    /// Append only if `guard` accepts the current changelog.
    ///
    /// Returns `Ok(None)` when the guard rejects. The default implementation
    /// reads, checks and appends without holding anything in between, so two
    /// callers may both pass the guard; see `supports_atomic_append`.
    fn append_changelog_entry_if(
        &self,
        entry: ChangelogEntry,
        guard: AppendGuard<'_>,
    ) -> Result<Option<ChangelogEntry>, StorageError> {
        let current = self.get_operation_plan_changelog(&entry.domain, &entry.operation_id)?;
        if !guard(&current) {
            return Ok(None);
        }
        self.append_changelog_entry(entry).map(Some)
    }

    /// Whether `append_changelog_entry_if` is a true compare-and-append
    fn supports_atomic_append(&self) -> bool {
        false
    }
}

impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    fn create_operation(&self, operation: &Operation) -> Result<(), StorageError> {
        (**self).create_operation(operation)
    }

    fn get_operation(&self, domain: &str, id: &str) -> Result<Operation, StorageError> {
        (**self).get_operation(domain, id)
    }

    fn get_last_operation(&self) -> Result<Operation, StorageError> {
        (**self).get_last_operation()
    }

    fn update_operation_state(
        &self,
        domain: &str,
        id: &str,
        state: OperationState,
    ) -> Result<Operation, StorageError> {
        (**self).update_operation_state(domain, id, state)
    }

    fn create_operation_plan(&self, plan: &OperationPlan) -> Result<(), StorageError> {
        (**self).create_operation_plan(plan)
    }

    fn get_operation_plan(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<OperationPlan, StorageError> {
        (**self).get_operation_plan(domain, operation_id)
    }

    fn get_operation_plan_changelog(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<Vec<ChangelogEntry>, StorageError> {
        (**self).get_operation_plan_changelog(domain, operation_id)
    }

    fn append_changelog_entry(
        &self,
        entry: ChangelogEntry,
    ) -> Result<ChangelogEntry, StorageError> {
        (**self).append_changelog_entry(entry)
    }

    fn append_changelog_entry_if(
        &self,
        entry: ChangelogEntry,
        guard: AppendGuard<'_>,
    ) -> Result<Option<ChangelogEntry>, StorageError> {
        (**self).append_changelog_entry_if(entry, guard)
    }

    fn supports_atomic_append(&self) -> bool {
        (**self).supports_atomic_append()
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
