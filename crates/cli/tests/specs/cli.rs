// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level CLI specs: help, completions, missing state

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    let temp = Project::empty();
    temp.orbit()
        .args(["--help"])
        .passes()
        .stdout_has("init")
        .stdout_has("plan")
        .stdout_has("completions");
}

#[test]
fn plan_help_lists_subcommands() {
    let temp = Project::empty();
    temp.orbit()
        .args(["plan", "--help"])
        .passes()
        .stdout_has("execute")
        .stdout_has("rollback")
        .stdout_has("resume")
        .stdout_has("rollback-all");
}

#[test]
fn completions_for_bash() {
    let temp = Project::empty();
    temp.orbit()
        .args(["completions", "bash"])
        .passes()
        .stdout_has("orbit");
}

#[test]
fn plan_without_operation_suggests_init() {
    let temp = Project::empty();
    temp.orbit()
        .args(["plan"])
        .fails()
        .stderr_has("error: no operation found")
        .stderr_has("orbit init <plan-file>");
}

#[test]
fn explicit_config_must_exist() {
    let temp = Project::empty();
    let mut cmd = assert_cmd::Command::cargo_bin("orbit").unwrap();
    cmd.current_dir(temp.path())
        .args(["--config", "missing.toml", "plan"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("config file not found"));
}

#[test]
fn invalid_config_is_reported() {
    let temp = Project::empty();
    temp.file("orbit.toml", "[runner]\nkind = \"telnet\"\n");
    temp.orbit()
        .args(["plan"])
        .fails()
        .stderr_has("failed to parse");
}
