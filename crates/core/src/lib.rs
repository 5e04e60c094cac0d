// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orbit-core: data model for cluster operation plans
//!
//! This crate provides:
//! - The plan tree (phases, servers, phase states)
//! - Operation records and the phase changelog
//! - Pure plan resolution (changelog folded onto a base plan)
//! - Clock, ID and configuration plumbing shared by the other crates

pub mod clock;
pub mod config;
pub mod id;

pub mod changelog;
pub mod operation;
pub mod plan;
pub mod resolve;

// Re-exports
pub use changelog::ChangelogEntry;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, EngineConfig, RetryConfig, RunnerConfig, RunnerKind};
pub use id::{machine_id, IdGen, SequentialIdGen, UuidIdGen};
pub use operation::{Operation, OperationState, OperationType};
pub use plan::{
    ClusterRole, OperationPlan, Phase, PhaseData, PhaseId, PhaseState, PlanError, Server,
};
pub use resolve::{resolve_plan, unknown_phases};
