// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{masters_plan, node1, params_for};
use orbit_adapters::FakeRunner;
use orbit_core::{FakeClock, OperationPlan, Phase};

fn plan_with(phase: Phase) -> OperationPlan {
    let clock = FakeClock::new();
    let mut plan = masters_plan(&clock);
    plan.phases.push(phase);
    plan
}

#[tokio::test]
async fn execute_runs_command_through_sh() {
    let clock = FakeClock::new();
    let plan = masters_plan(&clock);
    let runner = FakeRunner::new();

    let executor = CommandExecutor::new(params_for(&plan, "/masters/node1", &runner)).unwrap();
    executor.execute(&CancellationToken::new()).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].hostname, "node-1");
    assert_eq!(calls[0].args, vec!["sh", "-c", "update node-1"]);
}

#[tokio::test]
async fn rollback_runs_rollback_detail() {
    let clock = FakeClock::new();
    let plan = masters_plan(&clock);
    let runner = FakeRunner::new();

    let executor = CommandExecutor::new(params_for(&plan, "/masters/node2", &runner)).unwrap();
    executor.rollback(&CancellationToken::new()).await.unwrap();

    assert_eq!(runner.calls()[0].args, vec!["sh", "-c", "revert node-2"]);
}

#[tokio::test]
async fn rollback_without_detail_is_noop() {
    let plan = plan_with(
        Phase::new("/extra", "")
            .with_executor("command")
            .with_server(node1())
            .with_detail("command", "true"),
    );
    let runner = FakeRunner::new();
    let executor = CommandExecutor::new(params_for(&plan, "/extra", &runner)).unwrap();

    executor.rollback(&CancellationToken::new()).await.unwrap();
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn check_detail_runs_as_pre_check() {
    let plan = plan_with(
        Phase::new("/extra", "Extra")
            .with_executor("command")
            .with_server(node1())
            .with_detail("command", "true")
            .with_detail("check", "test -f /etc/ready"),
    );
    let runner = FakeRunner::new();
    runner.push_failure(1, "");
    let executor = CommandExecutor::new(params_for(&plan, "/extra", &runner)).unwrap();

    let err = executor.pre_check(&CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().starts_with("pre-check failed: "));
    assert_eq!(runner.calls()[0].args[2], "test -f /etc/ready");
}

#[tokio::test]
async fn non_zero_exit_is_a_permanent_runner_error() {
    let clock = FakeClock::new();
    let plan = masters_plan(&clock);
    let runner = FakeRunner::new();
    runner.push_failure(2, "no such package");

    let executor = CommandExecutor::new(params_for(&plan, "/masters/node1", &runner)).unwrap();
    let err = executor.execute(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, PhaseError::Runner(_)));
    assert!(!err.is_transient());
    assert!(err.to_string().contains("no such package"));
}

#[test]
fn command_detail_is_required() {
    let plan = plan_with(
        Phase::new("/extra", "Extra")
            .with_executor("command")
            .with_server(node1()),
    );
    let err = CommandExecutor::new(params_for(&plan, "/extra", &FakeRunner::new()))
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "bad parameter: command is required");
}

#[test]
fn server_is_required() {
    let plan = plan_with(
        Phase::new("/extra", "Extra")
            .with_executor("command")
            .with_detail("command", "true"),
    );
    let err = CommandExecutor::new(params_for(&plan, "/extra", &FakeRunner::new()))
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "bad parameter: server is required");
}

#[tokio::test]
async fn description_defaults_to_command() {
    let plan = plan_with(
        Phase::new("/extra", "")
            .with_executor("command")
            .with_server(node1())
            .with_detail("command", "systemctl restart etcd"),
    );
    let params = params_for(&plan, "/extra", &FakeRunner::new());
    let progress = params.progress.clone();
    let executor = CommandExecutor::new(params).unwrap();

    executor.execute(&CancellationToken::new()).await.unwrap();
    assert_eq!(progress.steps(), vec!["Run systemctl restart etcd"]);
}
