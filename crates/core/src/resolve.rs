// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan resolution
//!
//! Folds a changelog onto a base plan. Pure and deterministic: resolving the
//! same pair always yields the same tree, which is what makes restarts
//! idempotent.

use crate::changelog::{latest_by_phase, ChangelogEntry};
use crate::plan::{OperationPlan, PhaseId};

/// Current state of `base` given every entry recorded against it.
///
/// The latest entry per leaf phase sets its state, error and sequence;
/// phases without entries are `Unstarted`. Entries for other operations,
/// unknown phases or composite phases are ignored.
pub fn resolve_plan(base: &OperationPlan, changelog: &[ChangelogEntry]) -> OperationPlan {
    let mut plan = base.clone();
    plan.reset_states();

    let relevant: Vec<ChangelogEntry> = changelog
        .iter()
        .filter(|e| e.is_for(base))
        .cloned()
        .collect();

    for (id, entry) in latest_by_phase(&relevant) {
        let Some(phase) = plan.find_phase_mut(id) else {
            continue;
        };
        if !phase.is_leaf() {
            continue;
        }
        phase.state = entry.state;
        phase.error = entry.error.clone();
        phase.updated = Some(entry.created);
        phase.sequence = Some(entry.sequence);
    }

    plan.derive_composite_states();
    plan
}

/// Phase IDs referenced by the changelog that do not exist in the plan
pub fn unknown_phases(base: &OperationPlan, changelog: &[ChangelogEntry]) -> Vec<PhaseId> {
    let mut unknown: Vec<PhaseId> = changelog
        .iter()
        .filter(|e| e.is_for(base) && base.find_phase(&e.phase_id).is_none())
        .map(|e| e.phase_id.clone())
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
