// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbit plan rollback` and `orbit plan rollback-all` specs

use crate::prelude::*;

#[test]
fn rollback_runs_the_rollback_command() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/masters/node-1"])
        .passes();

    temp.orbit()
        .args(["plan", "rollback", "/masters/node-1"])
        .passes()
        .stdout_has("Phase /masters/node-1 rolled back");

    assert_eq!(temp.read("trace"), "node-1\nundo-1\n");
    assert_eq!(phase_state(&temp.plan_json(), "/masters/node-1"), "rolled_back");
}

#[test]
fn rollback_requires_dependents_rolled_back() {
    let temp = Project::initialized();
    temp.orbit().args(["plan", "execute", "/masters"]).passes();

    temp.orbit()
        .args(["plan", "rollback", "/masters/node-1"])
        .fails()
        .stderr_has("roll back /masters/node-2 first")
        .stderr_has("orbit plan rollback /masters/node-2");

    temp.orbit()
        .args(["plan", "rollback", "/masters/node-1", "--force"])
        .passes();
    assert_eq!(temp.read("trace"), "node-1\nnode-2\nundo-1\n");
}

#[test]
fn rollback_unstarted_phase_is_rejected() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "rollback", "/masters/node-1"])
        .fails()
        .stderr_has("cannot roll back phase /masters/node-1 in state unstarted");
}

#[test]
fn rollback_all_reverses_executed_phases() {
    let temp = Project::initialized();
    temp.orbit().args(["plan", "resume"]).passes();

    temp.orbit()
        .args(["plan", "rollback-all"])
        .passes()
        .stdout_has("Operation op-1 rolled back");

    assert_eq!(temp.read("trace"), "node-1\nnode-2\nundo-2\nundo-1\n");
    let plan = temp.plan_json();
    assert_eq!(phase_state(&plan, "/masters"), "rolled_back");
    assert_eq!(phase_state(&plan, "/health"), "rolled_back");
}

#[test]
fn rollback_all_with_nothing_executed_is_a_no_op() {
    let temp = Project::initialized();
    temp.orbit().args(["plan", "rollback-all"]).passes();
    assert_eq!(temp.read("trace"), "");
}
