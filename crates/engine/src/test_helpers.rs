// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine unit tests

use crate::executor::{ExecutorParams, Progress};
use crate::fsm::{Fsm, FsmDeps};
use crate::retry::RetryPolicy;
use orbit_adapters::FakeRunner;
use orbit_core::{
    ClusterRole, Clock, EngineConfig, FakeClock, Operation, OperationPlan, OperationType, Phase,
    PhaseId, Server,
};
use orbit_storage::{Backend, MemoryBackend};
use std::time::Duration;

pub const CLUSTER: &str = "example.com";
pub const OPERATION: &str = "op-1";

pub fn node1() -> Server {
    Server::new("node-1", "10.0.0.1", ClusterRole::Master)
}

pub fn node2() -> Server {
    Server::new("node-2", "10.0.0.2", ClusterRole::Master)
}

pub fn worker() -> Server {
    Server::new("node-3", "10.0.0.3", ClusterRole::Node)
}

/// `/masters/node1` then `/masters/node2`, node2 requiring node1
pub fn masters_plan(clock: &FakeClock) -> OperationPlan {
    OperationPlan::new(OPERATION, OperationType::Update, CLUSTER, clock.now())
        .with_servers(vec![node1(), node2(), worker()])
        .with_phases(vec![Phase::new("/masters", "Update masters").with_phases(vec![
            Phase::new("/masters/node1", "Update node-1")
                .with_executor("command")
                .with_server(node1())
                .with_detail("command", "update node-1")
                .with_detail("rollback", "revert node-1"),
            Phase::new("/masters/node2", "Update node-2")
                .with_executor("command")
                .with_server(node2())
                .with_detail("command", "update node-2")
                .with_detail("rollback", "revert node-2")
                .with_requires(["/masters/node1"]),
        ])])
}

/// Retries quickly so tests do not wait on the default backoff
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_initial_interval(Duration::from_millis(5))
        .with_max_interval(Duration::from_millis(20))
        .with_max_elapsed_time(Duration::from_millis(200))
}

pub struct Harness {
    pub backend: MemoryBackend,
    pub runner: FakeRunner,
    pub clock: FakeClock,
    pub fsm: Fsm<MemoryBackend, FakeRunner, FakeClock>,
}

impl Harness {
    pub fn new(plan_fn: impl FnOnce(&FakeClock) -> OperationPlan) -> Self {
        let clock = FakeClock::new();
        let backend = MemoryBackend::new();
        let runner = FakeRunner::new();
        let plan = plan_fn(&clock);
        plan.validate().unwrap();
        backend
            .create_operation(&Operation::new(
                &plan.operation_id,
                &plan.cluster_name,
                plan.operation_type,
                &clock,
            ))
            .unwrap();
        backend.create_operation_plan(&plan).unwrap();

        let fsm = Self::fsm_for(&backend, &runner, &clock, &plan);
        Self {
            backend,
            runner,
            clock,
            fsm,
        }
    }

    /// Another engine sharing this harness's backend and runner
    pub fn second_engine(&self) -> Fsm<MemoryBackend, FakeRunner, FakeClock> {
        let plan = self
            .backend
            .get_operation_plan(CLUSTER, OPERATION)
            .unwrap();
        Self::fsm_for(&self.backend, &self.runner, &self.clock, &plan)
    }

    fn fsm_for(
        backend: &MemoryBackend,
        runner: &FakeRunner,
        clock: &FakeClock,
        plan: &OperationPlan,
    ) -> Fsm<MemoryBackend, FakeRunner, FakeClock> {
        Fsm::new(
            FsmDeps {
                backend: backend.clone(),
                runner: runner.clone(),
                clock: clock.clone(),
            },
            &plan.cluster_name,
            &plan.operation_id,
        )
        .with_retry(fast_retry())
    }

    pub fn changelog(&self) -> Vec<orbit_core::ChangelogEntry> {
        self.backend
            .get_operation_plan_changelog(CLUSTER, OPERATION)
            .unwrap()
    }

    pub fn state_of(&self, id: &str) -> orbit_core::PhaseState {
        let plan = self.fsm.get_plan().unwrap();
        plan.find_phase(&PhaseId::new(id)).unwrap().state
    }
}

/// Executor params for `phase_id` of `plan`
pub fn params_for(
    plan: &OperationPlan,
    phase_id: &str,
    runner: &FakeRunner,
) -> ExecutorParams<FakeRunner> {
    let phase = plan.find_phase(&PhaseId::new(phase_id)).unwrap().clone();
    let span = tracing::info_span!("test");
    ExecutorParams {
        plan: plan.clone(),
        progress: Progress::new(&phase, plan.total_steps(), span.clone()),
        phase,
        runner: runner.clone(),
        config: EngineConfig::default(),
        retry: fast_retry(),
        span,
    }
}
