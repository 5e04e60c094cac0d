// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbit plan execute` and `orbit plan resume` specs

use crate::prelude::*;

#[test]
fn execute_runs_the_phase_command() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/masters/node-1"])
        .passes()
        .stdout_has("Update node-1")
        .stdout_has("Phase /masters/node-1 completed");

    assert_eq!(temp.read("trace"), "node-1\n");
    assert_eq!(phase_state(&temp.plan_json(), "/masters/node-1"), "completed");
}

#[test]
fn execute_enforces_requirements() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/masters/node-2"])
        .fails()
        .stderr_has("phase /masters/node-2 requires /masters/node-1")
        .stderr_has("orbit plan execute /masters/node-1");

    assert_eq!(temp.read("trace"), "");
    assert_eq!(phase_state(&temp.plan_json(), "/masters/node-2"), "unstarted");
}

#[test]
fn execute_completed_phase_needs_force() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/masters/node-1"])
        .passes();

    temp.orbit()
        .args(["plan", "execute", "/masters/node-1"])
        .fails()
        .stderr_has("already completed")
        .stderr_has("--force");

    temp.orbit()
        .args(["plan", "execute", "/masters/node-1", "--force"])
        .passes();
    assert_eq!(temp.read("trace"), "node-1\nnode-1\n");
}

#[test]
fn execute_composite_runs_leaves_in_order() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/masters"])
        .passes()
        .stdout_has("Phase /masters completed");

    assert_eq!(temp.read("trace"), "node-1\nnode-2\n");
    assert_eq!(phase_state(&temp.plan_json(), "/masters"), "completed");
}

#[test]
fn execute_unknown_phase() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/nope"])
        .fails()
        .stderr_has("phase /nope not found");
}

#[test]
fn failed_phase_is_recorded() {
    let temp = Project::initialized();
    temp.file("plan.toml", &TWO_NODE_PLAN.replace("op-1", "op-2").replace(
        "echo node-1 >> trace",
        "echo boom >&2; exit 3",
    ));
    temp.orbit().args(["init", "plan.toml"]).passes();

    temp.orbit()
        .args(["plan", "execute", "/masters/node-1"])
        .fails()
        .stderr_has("phase /masters/node-1 failed")
        .stderr_has("boom")
        .stderr_has("orbit plan rollback /masters/node-1");

    let plan = temp.plan_json();
    assert_eq!(plan["operation"]["id"], "op-2");
    assert_eq!(phase_state(&plan, "/masters/node-1"), "failed");
    temp.orbit().args(["plan"]).passes().stdout_has("error:");
}

#[test]
fn resume_completes_the_operation() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "resume"])
        .passes()
        .stdout_has("Operation op-1 completed");

    assert_eq!(temp.read("trace"), "node-1\nnode-2\n");
    let plan = temp.plan_json();
    assert_eq!(plan["operation"]["state"], "completed");
    assert_eq!(phase_state(&plan, "/health"), "completed");
}

#[test]
fn resume_continues_after_manual_steps() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/masters/node-1"])
        .passes();
    temp.orbit().args(["plan", "resume"]).passes();

    assert_eq!(temp.read("trace"), "node-1\nnode-2\n");
}

#[test]
fn resume_failure_marks_operation_failed() {
    let temp = Project::empty();
    temp.file(
        "plan.toml",
        &TWO_NODE_PLAN.replace("echo node-2 >> trace", "false"),
    );
    temp.orbit().args(["init", "plan.toml"]).passes();

    temp.orbit()
        .args(["plan", "resume"])
        .fails()
        .stderr_has("phase /masters/node-2 failed");

    let plan = temp.plan_json();
    assert_eq!(plan["operation"]["state"], "failed");
    assert_eq!(phase_state(&plan, "/masters/node-1"), "completed");
    assert_eq!(phase_state(&plan, "/health"), "unstarted");
}
