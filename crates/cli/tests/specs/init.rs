// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbit init` specs

use crate::prelude::*;

#[test]
fn init_prints_operation_id() {
    let temp = Project::empty();
    temp.file("plan.toml", TWO_NODE_PLAN);
    temp.orbit()
        .args(["init", "plan.toml"])
        .passes()
        .stdout_eq("op-1\n");
}

#[test]
fn init_generates_an_id_when_absent() {
    let temp = Project::empty();
    temp.file("plan.toml", &TWO_NODE_PLAN.replace("id = \"op-1\"\n", ""));
    let id = temp.orbit().args(["init", "plan.toml"]).passes().stdout();
    assert_eq!(id.trim().len(), 36, "expected a UUID, got {:?}", id);
}

#[test]
fn init_writes_the_log_file() {
    let temp = Project::initialized();
    assert!(temp.state_dir().join("orbit.log").exists());
}

#[test]
fn init_rejects_unknown_server() {
    let temp = Project::empty();
    temp.file(
        "plan.toml",
        &TWO_NODE_PLAN.replace("server = \"node-2\"", "server = \"node-9\""),
    );
    temp.orbit()
        .args(["init", "plan.toml"])
        .fails()
        .stderr_has("references unknown server node-9");
}

#[test]
fn init_rejects_unknown_requirement() {
    let temp = Project::empty();
    temp.file(
        "plan.toml",
        &TWO_NODE_PLAN.replace("requires = [\"/masters\"]", "requires = [\"/etcd\"]"),
    );
    temp.orbit()
        .args(["init", "plan.toml"])
        .fails()
        .stderr_has("/etcd");
}

#[test]
fn init_twice_with_same_id_fails() {
    let temp = Project::initialized();
    temp.orbit().args(["init", "plan.toml"]).fails();
}

#[test]
fn init_missing_file_fails() {
    let temp = Project::empty();
    temp.orbit()
        .args(["init", "nope.toml"])
        .fails()
        .stderr_has("nope.toml");
}
