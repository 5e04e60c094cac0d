// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation plan data model
//!
//! A plan is a tree of phases. Leaf phases carry an executor kind and are
//! the only phases that ever receive changelog entries; composite phases
//! derive their state from their children.

use crate::operation::OperationType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Hierarchical phase identifier, e.g. `/masters/node1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseId(pub String);

impl PhaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier of a child phase named `name`
    pub fn child(&self, name: &str) -> PhaseId {
        PhaseId(format!("{}/{}", self.0.trim_end_matches('/'), name))
    }

    /// Enclosing phase, or `None` for top-level phases
    pub fn parent(&self) -> Option<PhaseId> {
        let trimmed = self.0.trim_end_matches('/');
        let idx = trimmed.rfind('/')?;
        if idx == 0 {
            return None;
        }
        Some(PhaseId(trimmed[..idx].to_string()))
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True when `other` is nested (at any depth) under this phase
    pub fn is_ancestor_of(&self, other: &PhaseId) -> bool {
        let prefix = self.0.trim_end_matches('/');
        other.0.len() > prefix.len()
            && other.0.starts_with(prefix)
            && other.0.as_bytes().get(prefix.len()) == Some(&b'/')
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PhaseId {
    fn from(s: &str) -> Self {
        PhaseId(s.to_string())
    }
}

impl From<String> for PhaseId {
    fn from(s: String) -> Self {
        PhaseId(s)
    }
}

/// State of a phase as derived from the changelog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    #[default]
    Unstarted,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

impl PhaseState {
    pub fn name(&self) -> &'static str {
        match self {
            PhaseState::Unstarted => "unstarted",
            PhaseState::InProgress => "in_progress",
            PhaseState::Completed => "completed",
            PhaseState::Failed => "failed",
            PhaseState::RolledBack => "rolled_back",
        }
    }

    /// Whether the engine may record `next` after `self`.
    ///
    /// An in-progress phase may settle into any other state (including the
    /// state it had before the attempt, after a cancellation).
    pub fn can_transition_to(&self, next: PhaseState) -> bool {
        use PhaseState::*;
        match (self, next) {
            (InProgress, InProgress) => false,
            (InProgress, _) => true,
            (Unstarted | Completed | Failed | RolledBack, InProgress) => true,
            (Completed, RolledBack) => true,
            _ => false,
        }
    }

    /// States a phase may be (re-)executed from without `force`
    pub fn is_runnable(&self) -> bool {
        matches!(
            self,
            PhaseState::Unstarted | PhaseState::Failed | PhaseState::RolledBack
        )
    }

    /// States a phase may be rolled back from without `force`
    pub fn is_rollback_eligible(&self) -> bool {
        matches!(self, PhaseState::Completed | PhaseState::Failed)
    }

    /// States that do not block rolling back a phase this one depends on
    pub fn is_rolled_back_or_unstarted(&self) -> bool {
        matches!(self, PhaseState::Unstarted | PhaseState::RolledBack)
    }
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Role of a server in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    Master,
    Node,
}

/// A cluster node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Server {
    pub advertise_ip: String,
    pub hostname: String,
    pub cluster_role: ClusterRole,
}

impl Server {
    pub fn new(
        hostname: impl Into<String>,
        advertise_ip: impl Into<String>,
        cluster_role: ClusterRole,
    ) -> Self {
        Self {
            advertise_ip: advertise_ip.into(),
            hostname: hostname.into(),
            cluster_role,
        }
    }

    pub fn is_master(&self) -> bool {
        self.cluster_role == ClusterRole::Master
    }
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.hostname, self.advertise_ip)
    }
}

/// Operation-specific context bound to a phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<Server>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

/// A node in the plan tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    #[serde(default)]
    pub description: String,
    /// Executor kind looked up in the registry; composite phases have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PhaseData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<PhaseId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub state: PhaseState,
    #[serde(default)]
    pub step: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Backend sequence of the changelog entry that set `state`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl Phase {
    pub fn new(id: impl Into<PhaseId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            executor: None,
            data: None,
            requires: Vec::new(),
            phases: Vec::new(),
            state: PhaseState::Unstarted,
            step: 0,
            error: None,
            updated: None,
            sequence: None,
        }
    }

    pub fn with_executor(mut self, kind: impl Into<String>) -> Self {
        self.executor = Some(kind.into());
        self
    }

    pub fn with_server(mut self, server: Server) -> Self {
        self.data.get_or_insert_with(PhaseData::default).server = Some(server);
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.data.get_or_insert_with(PhaseData::default).package = Some(package.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data
            .get_or_insert_with(PhaseData::default)
            .details
            .insert(key.into(), value.into());
        self
    }

    pub fn with_requires(mut self, requires: impl IntoIterator<Item = impl Into<PhaseId>>) -> Self {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_phases(mut self, phases: Vec<Phase>) -> Self {
        self.phases = phases;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.phases.is_empty()
    }

    /// Server bound to this phase, if any
    pub fn server(&self) -> Option<&Server> {
        self.data.as_ref().and_then(|d| d.server.as_ref())
    }

    /// A detail value bound to this phase, if any
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.details.get(key))
            .map(String::as_str)
    }

    /// This phase and all of its descendants, pre-order
    pub fn flatten(&self) -> Vec<&Phase> {
        let mut out = vec![self];
        for child in &self.phases {
            out.extend(child.flatten());
        }
        out
    }

    /// Leaf descendants in plan order (the phase itself when it is a leaf)
    pub fn leaves(&self) -> Vec<&Phase> {
        self.flatten().into_iter().filter(|p| p.is_leaf()).collect()
    }

    fn find(&self, id: &PhaseId) -> Option<&Phase> {
        if &self.id == id {
            return Some(self);
        }
        self.phases.iter().find_map(|p| p.find(id))
    }

    fn find_mut(&mut self, id: &PhaseId) -> Option<&mut Phase> {
        if &self.id == id {
            return Some(self);
        }
        self.phases.iter_mut().find_map(|p| p.find_mut(id))
    }

    fn reset(&mut self) {
        self.state = PhaseState::Unstarted;
        self.error = None;
        self.updated = None;
        self.sequence = None;
        for child in &mut self.phases {
            child.reset();
        }
    }

    fn derive_state(&mut self) {
        if self.is_leaf() {
            return;
        }
        for child in &mut self.phases {
            child.derive_state();
        }
        let states: Vec<PhaseState> = self.phases.iter().map(|p| p.state).collect();
        self.state = composite_state(&states);
        self.error = self.phases.iter().find_map(|p| p.error.clone());
        self.updated = self.phases.iter().filter_map(|p| p.updated).max();
    }

    fn number(&mut self, next: &mut u32) {
        *next += 1;
        self.step = *next;
        for child in &mut self.phases {
            child.number(next);
        }
    }
}

/// State of a composite phase given the states of its children
pub fn composite_state(children: &[PhaseState]) -> PhaseState {
    let all = |s: PhaseState| children.iter().all(|c| *c == s);
    let any = |s: PhaseState| children.iter().any(|c| *c == s);
    if children.is_empty() || all(PhaseState::Unstarted) {
        PhaseState::Unstarted
    } else if any(PhaseState::Failed) {
        PhaseState::Failed
    } else if all(PhaseState::Completed) {
        PhaseState::Completed
    } else if all(PhaseState::RolledBack) {
        PhaseState::RolledBack
    } else {
        PhaseState::InProgress
    }
}

/// Errors found while validating a plan
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("plan has no phases")]
    Empty,
    #[error("duplicate phase ID: {0}")]
    DuplicatePhase(PhaseId),
    #[error("phase ID {0} must start with '/'")]
    InvalidPhaseId(PhaseId),
    #[error("phase {phase} requires unknown phase {requires}")]
    UnknownRequirement { phase: PhaseId, requires: PhaseId },
    #[error("phase {phase} cannot require {requires}: it is the phase itself or on its path")]
    SelfRequirement { phase: PhaseId, requires: PhaseId },
    #[error("phase {0} has no sub-phases and no executor")]
    MissingExecutor(PhaseId),
    #[error("phase {0} is part of a requirement cycle")]
    RequirementCycle(PhaseId),
}

/// The full phase tree for one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPlan {
    pub operation_id: String,
    pub operation_type: OperationType,
    pub cluster_name: String,
    #[serde(default)]
    pub servers: Vec<Server>,
    pub phases: Vec<Phase>,
    pub created: DateTime<Utc>,
}

impl OperationPlan {
    pub fn new(
        operation_id: impl Into<String>,
        operation_type: OperationType,
        cluster_name: impl Into<String>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            operation_type,
            cluster_name: cluster_name.into(),
            servers: Vec::new(),
            phases: Vec::new(),
            created,
        }
    }

    pub fn with_servers(mut self, servers: Vec<Server>) -> Self {
        self.servers = servers;
        self
    }

    /// Set the phase tree and number every phase in plan order
    pub fn with_phases(mut self, phases: Vec<Phase>) -> Self {
        self.phases = phases;
        let mut next = 0;
        for phase in &mut self.phases {
            phase.number(&mut next);
        }
        self
    }

    /// Key used to index plans by cluster and operation
    pub fn key(&self) -> String {
        format!("{}/{}", self.cluster_name, self.operation_id)
    }

    pub fn find_phase(&self, id: &PhaseId) -> Option<&Phase> {
        self.phases.iter().find_map(|p| p.find(id))
    }

    pub(crate) fn find_phase_mut(&mut self, id: &PhaseId) -> Option<&mut Phase> {
        self.phases.iter_mut().find_map(|p| p.find_mut(id))
    }

    /// Every phase, pre-order
    pub fn all_phases(&self) -> Vec<&Phase> {
        self.phases.iter().flat_map(|p| p.flatten()).collect()
    }

    /// Leaf phases in plan order
    pub fn leaves(&self) -> Vec<&Phase> {
        self.phases.iter().flat_map(|p| p.leaves()).collect()
    }

    /// Enclosing phases of `id`, outermost first
    pub fn ancestors(&self, id: &PhaseId) -> Vec<&Phase> {
        let mut out = Vec::new();
        let mut current = id.parent();
        while let Some(parent) = current {
            if let Some(phase) = self.find_phase(&parent) {
                out.push(phase);
            }
            current = parent.parent();
        }
        out.reverse();
        out
    }

    /// Requirements of a phase including those inherited from its ancestors
    pub fn effective_requires(&self, id: &PhaseId) -> Vec<PhaseId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let own = self.find_phase(id).map(|p| p.requires.iter());
        let inherited = self.ancestors(id).into_iter().flat_map(|p| p.requires.iter());
        for req in inherited.chain(own.into_iter().flatten()) {
            if seen.insert(req.clone()) {
                out.push(req.clone());
            }
        }
        out
    }

    /// Requirements of `id` that are not completed, with their current state
    pub fn unmet_requirements(&self, id: &PhaseId) -> Vec<(PhaseId, PhaseState)> {
        self.effective_requires(id)
            .into_iter()
            .filter_map(|req| {
                let state = self
                    .find_phase(&req)
                    .map(|p| p.state)
                    .unwrap_or(PhaseState::Unstarted);
                (state != PhaseState::Completed).then_some((req, state))
            })
            .collect()
    }

    /// Leaf phases that depend on `id` (directly, or through a requirement
    /// on one of its ancestors)
    pub fn dependents(&self, id: &PhaseId) -> Vec<&Phase> {
        self.leaves()
            .into_iter()
            .filter(|leaf| &leaf.id != id && !id.is_ancestor_of(&leaf.id))
            .filter(|leaf| {
                self.effective_requires(&leaf.id)
                    .iter()
                    .any(|req| req == id || req.is_ancestor_of(id))
            })
            .collect()
    }

    /// Leaves that can run now: runnable state and all requirements completed
    pub fn runnable(&self) -> Vec<&Phase> {
        self.leaves()
            .into_iter()
            .filter(|p| p.state.is_runnable() && self.unmet_requirements(&p.id).is_empty())
            .collect()
    }

    pub fn in_progress(&self) -> Vec<&Phase> {
        self.leaves()
            .into_iter()
            .filter(|p| p.state == PhaseState::InProgress)
            .collect()
    }

    pub fn failed(&self) -> Vec<&Phase> {
        self.leaves()
            .into_iter()
            .filter(|p| p.state == PhaseState::Failed)
            .collect()
    }

    /// True when every leaf phase is completed
    pub fn is_completed(&self) -> bool {
        self.leaves()
            .iter()
            .all(|p| p.state == PhaseState::Completed)
    }

    /// True when every leaf phase is rolled back or never ran
    pub fn is_rolled_back(&self) -> bool {
        self.leaves()
            .iter()
            .all(|p| p.state.is_rolled_back_or_unstarted())
    }

    /// (completed leaves, total leaves)
    pub fn progress(&self) -> (usize, usize) {
        let leaves = self.leaves();
        let done = leaves
            .iter()
            .filter(|p| p.state == PhaseState::Completed)
            .count();
        (done, leaves.len())
    }

    /// Highest step number assigned in this plan
    pub fn total_steps(&self) -> u32 {
        self.all_phases().iter().map(|p| p.step).max().unwrap_or(0)
    }

    /// Check structural invariants of the phase tree
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.phases.is_empty() {
            return Err(PlanError::Empty);
        }

        let all = self.all_phases();
        let mut ids = HashSet::new();
        for phase in &all {
            if !phase.id.as_str().starts_with('/') {
                return Err(PlanError::InvalidPhaseId(phase.id.clone()));
            }
            if !ids.insert(&phase.id) {
                return Err(PlanError::DuplicatePhase(phase.id.clone()));
            }
            if phase.is_leaf() && phase.executor.is_none() {
                return Err(PlanError::MissingExecutor(phase.id.clone()));
            }
        }

        for phase in &all {
            for req in &phase.requires {
                if !ids.contains(req) {
                    return Err(PlanError::UnknownRequirement {
                        phase: phase.id.clone(),
                        requires: req.clone(),
                    });
                }
                if req == &phase.id || req.is_ancestor_of(&phase.id) || phase.id.is_ancestor_of(req)
                {
                    return Err(PlanError::SelfRequirement {
                        phase: phase.id.clone(),
                        requires: req.clone(),
                    });
                }
            }
        }

        if let Some(id) = self.find_cycle() {
            return Err(PlanError::RequirementCycle(id));
        }

        Ok(())
    }

    /// A phase that (transitively) waits on itself, if any.
    ///
    /// A phase waits on its effective requirements and, when composite, on
    /// its children.
    fn find_cycle(&self) -> Option<PhaseId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            plan: &'a OperationPlan,
            phase: &'a Phase,
            marks: &mut BTreeMap<&'a PhaseId, Mark>,
        ) -> Option<PhaseId> {
            match marks.get(&phase.id) {
                Some(Mark::Visiting) => return Some(phase.id.clone()),
                Some(Mark::Done) => return None,
                None => {}
            }
            marks.insert(&phase.id, Mark::Visiting);
            let waits_on = plan
                .effective_requires(&phase.id)
                .into_iter()
                .filter_map(|req| plan.find_phase(&req))
                .chain(phase.phases.iter());
            for next in waits_on {
                if let Some(id) = visit(plan, next, marks) {
                    return Some(id);
                }
            }
            marks.insert(&phase.id, Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        self.all_phases()
            .into_iter()
            .find_map(|phase| visit(self, phase, &mut marks))
    }

    /// Reset all derived state back to the base plan
    pub(crate) fn reset_states(&mut self) {
        for phase in &mut self.phases {
            phase.reset();
        }
    }

    /// Recompute composite phase states from their children
    pub(crate) fn derive_composite_states(&mut self) {
        for phase in &mut self.phases {
            phase.derive_state();
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
