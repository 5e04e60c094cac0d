// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed file store
//!
//! Layout of the state directory:
//!
//! ```text
//! <dir>/wal.jsonl   append-only records
//! <dir>/orbit.lock  advisory lock shared by every process using <dir>
//! ```
//!
//! Reads take a shared lock and writes an exclusive one. Both first catch up
//! on entries other processes appended since the last call, so every
//! decision is made against the full log.

use crate::backend::{AppendGuard, Backend};
use crate::error::StorageError;
use crate::state::{MaterializedState, Record};
use crate::wal::{WalReader, WalWriter};
use fs2::FileExt;
use orbit_core::{ChangelogEntry, Operation, OperationPlan, OperationState};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const WAL_FILE: &str = "wal.jsonl";
const LOCK_FILE: &str = "orbit.lock";

/// Held advisory lock; released on drop
struct FileLock<'a>(&'a File);

impl<'a> FileLock<'a> {
    fn shared(file: &'a File) -> Result<Self, StorageError> {
        FileExt::lock_shared(file)?;
        Ok(Self(file))
    }

    fn exclusive(file: &'a File) -> Result<Self, StorageError> {
        FileExt::lock_exclusive(file)?;
        Ok(Self(file))
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.0) {
            tracing::warn!(error = %e, "failed to release state lock");
        }
    }
}

struct Inner {
    state: MaterializedState,
    /// Byte offset just past the last applied entry
    position: u64,
    next_wal_sequence: u64,
    writer: WalWriter,
    reader: WalReader,
}

impl Inner {
    /// Apply entries appended since the last call. Returns true when the
    /// log ends in a corrupt or truncated entry.
    fn catch_up(&mut self) -> Result<bool, StorageError> {
        let batch = self.reader.read_from(self.position)?;
        for entry in &batch.entries {
            if let Err(e) = self.state.apply(&entry.record) {
                tracing::warn!(
                    sequence = entry.sequence,
                    record = entry.record.name(),
                    error = %e,
                    "skipping wal entry that does not apply"
                );
            }
            self.next_wal_sequence = entry.sequence + 1;
        }
        self.position = batch.end;
        if let Some(corruption) = &batch.corruption {
            tracing::warn!(error = %corruption, "stopping wal replay at invalid entry");
        }
        Ok(batch.corruption.is_some())
    }

    fn append(&mut self, record: Record) -> Result<(), StorageError> {
        let (entry, len) = self.writer.append(self.next_wal_sequence, record)?;
        self.next_wal_sequence += 1;
        self.position += len;
        self.state.apply(&entry.record)
    }
}

/// Backend persisting records to a write-ahead log in a state directory.
///
/// Conditional appends are atomic across processes on the same host.
pub struct FileBackend {
    dir: PathBuf,
    lock_file: File,
    inner: Mutex<Inner>,
}

impl FileBackend {
    /// Open or create a store in `dir`, tagging entries with this host's ID
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        Self::open_with_machine_id(dir, &orbit_core::machine_id())
    }

    pub fn open_with_machine_id(dir: &Path, machine_id: &str) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let wal_path = dir.join(WAL_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(dir.join(LOCK_FILE))?;

        let backend = Self {
            dir: dir.to_path_buf(),
            lock_file,
            inner: Mutex::new(Inner {
                state: MaterializedState::new(),
                position: 0,
                next_wal_sequence: 0,
                writer: WalWriter::open(&wal_path, machine_id)?,
                reader: WalReader::new(&wal_path),
            }),
        };

        {
            let mut inner = backend.inner();
            let _lock = FileLock::shared(&backend.lock_file)?;
            inner.catch_up()?;
            tracing::debug!(
                dir = %dir.display(),
                entries = inner.next_wal_sequence,
                "opened state directory"
            );
        }
        Ok(backend)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn wal_path(&self) -> PathBuf {
        self.dir.join(WAL_FILE)
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&MaterializedState) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut inner = self.inner();
        let _lock = FileLock::shared(&self.lock_file)?;
        inner.catch_up()?;
        f(&inner.state)
    }

    /// Build a record against the caught-up state and append it.
    /// `build` returning `None` skips the append.
    fn write(
        &self,
        build: impl FnOnce(&MaterializedState) -> Result<Option<Record>, StorageError>,
    ) -> Result<Option<Record>, StorageError> {
        let mut inner = self.inner();
        let _lock = FileLock::exclusive(&self.lock_file)?;
        if inner.catch_up()? {
            let position = inner.position;
            tracing::warn!(position, "truncating wal at last valid entry");
            inner.writer.truncate(position)?;
        }

        let Some(record) = build(&inner.state)? else {
            return Ok(None);
        };
        inner.state.check(&record)?;
        inner.append(record.clone())?;
        Ok(Some(record))
    }
}

fn appended(record: Option<Record>) -> Option<ChangelogEntry> {
    match record {
        Some(Record::ChangelogAppended { entry }) => Some(entry),
        _ => None,
    }
}

fn changelog_record(state: &MaterializedState, mut entry: ChangelogEntry) -> Record {
    entry.sequence = state.next_sequence();
    Record::ChangelogAppended { entry }
}

impl Backend for FileBackend {
    fn create_operation(&self, operation: &Operation) -> Result<(), StorageError> {
        self.write(|_| {
            Ok(Some(Record::OperationCreated {
                operation: operation.clone(),
            }))
        })?;
        Ok(())
    }

    fn get_operation(&self, domain: &str, id: &str) -> Result<Operation, StorageError> {
        self.read(|state| {
            state
                .operation(domain, id)
                .cloned()
                .ok_or_else(|| StorageError::not_found("operation", format!("{}/{}", domain, id)))
        })
    }

    fn get_last_operation(&self) -> Result<Operation, StorageError> {
        self.read(|state| {
            state
                .last_operation()
                .cloned()
                .ok_or_else(|| StorageError::not_found("operation", "last"))
        })
    }

    fn update_operation_state(
        &self,
        domain: &str,
        id: &str,
        state: OperationState,
    ) -> Result<Operation, StorageError> {
        let mut updated = None;
        self.write(|current| {
            let mut op = current
                .operation(domain, id)
                .cloned()
                .ok_or_else(|| StorageError::not_found("operation", format!("{}/{}", domain, id)))?;
            op.state = state;
            updated = Some(op);
            Ok(Some(Record::OperationStateChanged {
                domain: domain.to_string(),
                id: id.to_string(),
                state,
            }))
        })?;
        updated.ok_or_else(|| StorageError::not_found("operation", format!("{}/{}", domain, id)))
    }

    fn create_operation_plan(&self, plan: &OperationPlan) -> Result<(), StorageError> {
        self.write(|_| Ok(Some(Record::PlanCreated { plan: plan.clone() })))?;
        Ok(())
    }

    fn get_operation_plan(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<OperationPlan, StorageError> {
        self.read(|state| {
            state.plan(domain, operation_id).cloned().ok_or_else(|| {
                StorageError::not_found("plan", format!("{}/{}", domain, operation_id))
            })
        })
    }

    fn get_operation_plan_changelog(
        &self,
        domain: &str,
        operation_id: &str,
    ) -> Result<Vec<ChangelogEntry>, StorageError> {
        self.read(|state| Ok(state.changelog(domain, operation_id).to_vec()))
    }

    fn append_changelog_entry(
        &self,
        entry: ChangelogEntry,
    ) -> Result<ChangelogEntry, StorageError> {
        let key = format!("{}/{}", entry.domain, entry.operation_id);
        let record = self.write(|state| Ok(Some(changelog_record(state, entry))))?;
        appended(record).ok_or_else(|| StorageError::not_found("plan", key))
    }

    fn append_changelog_entry_if(
        &self,
        entry: ChangelogEntry,
        guard: AppendGuard<'_>,
    ) -> Result<Option<ChangelogEntry>, StorageError> {
        let record = self.write(|state| {
            if !guard(state.changelog(&entry.domain, &entry.operation_id)) {
                return Ok(None);
            }
            Ok(Some(changelog_record(state, entry)))
        })?;
        Ok(appended(record))
    }

    fn supports_atomic_append(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
