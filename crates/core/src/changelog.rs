// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan changelog
//!
//! Append-only record of phase state transitions. Entries are never edited;
//! the latest entry for a phase is authoritative.

use crate::clock::Clock;
use crate::plan::{OperationPlan, PhaseId, PhaseState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single phase state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub operation_id: String,
    pub domain: String,
    pub phase_id: PhaseId,
    pub state: PhaseState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created: DateTime<Utc>,
    /// Assigned by the backend on append; 0 until then
    #[serde(default)]
    pub sequence: u64,
}

impl ChangelogEntry {
    pub fn new(
        plan: &OperationPlan,
        phase_id: PhaseId,
        state: PhaseState,
        clock: &impl Clock,
    ) -> Self {
        Self {
            operation_id: plan.operation_id.clone(),
            domain: plan.cluster_name.clone(),
            phase_id,
            state,
            error: None,
            created: clock.now(),
            sequence: 0,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether this entry belongs to the given plan
    pub fn is_for(&self, plan: &OperationPlan) -> bool {
        self.operation_id == plan.operation_id && self.domain == plan.cluster_name
    }
}

/// Entries in resolution order.
///
/// Backend sequence first, then timestamp, then position in `entries`; a
/// stable sort keeps last-appended-wins for identical keys.
pub fn ordered(entries: &[ChangelogEntry]) -> Vec<&ChangelogEntry> {
    let mut out: Vec<&ChangelogEntry> = entries.iter().collect();
    out.sort_by(|a, b| {
        a.sequence
            .cmp(&b.sequence)
            .then_with(|| a.created.cmp(&b.created))
    });
    out
}

/// The authoritative (last) entry for each phase
pub fn latest_by_phase(entries: &[ChangelogEntry]) -> BTreeMap<&PhaseId, &ChangelogEntry> {
    let mut latest = BTreeMap::new();
    for entry in ordered(entries) {
        latest.insert(&entry.phase_id, entry);
    }
    latest
}

/// The authoritative entry for one phase
pub fn latest_for<'a>(
    entries: &'a [ChangelogEntry],
    phase: &PhaseId,
) -> Option<&'a ChangelogEntry> {
    ordered(entries)
        .into_iter()
        .filter(|e| &e.phase_id == phase)
        .last()
}

#[cfg(test)]
#[path = "changelog_tests.rs"]
mod tests;
