// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from record replay
//!
//! Both backends keep one of these in memory. The memory backend applies
//! records directly; the file backend applies them as it reads the WAL.

use crate::error::StorageError;
use orbit_core::{ChangelogEntry, Operation, OperationPlan, OperationState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single durable state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    OperationCreated {
        operation: Operation,
    },
    OperationStateChanged {
        domain: String,
        id: String,
        state: OperationState,
    },
    PlanCreated {
        plan: OperationPlan,
    },
    ChangelogAppended {
        entry: ChangelogEntry,
    },
}

impl Record {
    pub fn name(&self) -> &'static str {
        match self {
            Record::OperationCreated { .. } => "operation_created",
            Record::OperationStateChanged { .. } => "operation_state_changed",
            Record::PlanCreated { .. } => "plan_created",
            Record::ChangelogAppended { .. } => "changelog_appended",
        }
    }
}

fn key(domain: &str, id: &str) -> String {
    format!("{}/{}", domain, id)
}

/// Operations, plans and changelogs built from applied records
#[derive(Debug, Clone, Default)]
pub struct MaterializedState {
    operations: BTreeMap<String, Operation>,
    /// Operation keys in creation order
    order: Vec<String>,
    plans: BTreeMap<String, OperationPlan>,
    changelogs: BTreeMap<String, Vec<ChangelogEntry>>,
    last_sequence: u64,
}

impl MaterializedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(&self, domain: &str, id: &str) -> Option<&Operation> {
        self.operations.get(&key(domain, id))
    }

    /// Most recently created operation; later insertion wins on equal timestamps
    pub fn last_operation(&self) -> Option<&Operation> {
        self.operations().fold(None, |last, op| match last {
            Some(l) if l.created > op.created => Some(l),
            _ => Some(op),
        })
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.order.iter().filter_map(|k| self.operations.get(k))
    }

    pub fn plan(&self, domain: &str, operation_id: &str) -> Option<&OperationPlan> {
        self.plans.get(&key(domain, operation_id))
    }

    pub fn changelog(&self, domain: &str, operation_id: &str) -> &[ChangelogEntry] {
        self.changelogs
            .get(&key(domain, operation_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Highest changelog sequence applied so far
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Sequence the next appended changelog entry receives
    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }

    /// Validate a record against the current state without applying it
    pub fn check(&self, record: &Record) -> Result<(), StorageError> {
        match record {
            Record::OperationCreated { operation } => {
                let k = key(&operation.site_domain, &operation.id);
                if self.operations.contains_key(&k) {
                    return Err(StorageError::already_exists("operation", k));
                }
            }
            Record::OperationStateChanged { domain, id, .. } => {
                if self.operation(domain, id).is_none() {
                    return Err(StorageError::not_found("operation", key(domain, id)));
                }
            }
            Record::PlanCreated { plan } => {
                if self.plans.contains_key(&plan.key()) {
                    return Err(StorageError::already_exists("plan", plan.key()));
                }
            }
            Record::ChangelogAppended { entry } => {
                if self.plan(&entry.domain, &entry.operation_id).is_none() {
                    return Err(StorageError::not_found(
                        "plan",
                        key(&entry.domain, &entry.operation_id),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Apply a record; invalid records leave the state untouched
    pub fn apply(&mut self, record: &Record) -> Result<(), StorageError> {
        self.check(record)?;
        match record {
            Record::OperationCreated { operation } => {
                let k = key(&operation.site_domain, &operation.id);
                self.order.push(k.clone());
                self.operations.insert(k, operation.clone());
            }
            Record::OperationStateChanged { domain, id, state } => {
                if let Some(op) = self.operations.get_mut(&key(domain, id)) {
                    op.state = *state;
                }
            }
            Record::PlanCreated { plan } => {
                self.plans.insert(plan.key(), plan.clone());
            }
            Record::ChangelogAppended { entry } => {
                self.last_sequence = self.last_sequence.max(entry.sequence);
                self.changelogs
                    .entry(key(&entry.domain, &entry.operation_id))
                    .or_default()
                    .push(entry.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
