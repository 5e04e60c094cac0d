// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbit plan` display specs

use crate::prelude::*;

#[test]
fn text_shows_operation_and_phases() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan"])
        .passes()
        .stdout_has("Operation: op-1 (update, example.com) in_progress")
        .stdout_has("/masters/node-1")
        .stdout_has("Check health")
        .stdout_has("Progress: 0/3 phases completed");
}

#[test]
fn show_subcommand_matches_default() {
    let temp = Project::initialized();
    let default = temp.orbit().args(["plan"]).passes().stdout();
    temp.orbit().args(["plan", "show"]).passes().stdout_eq(&default);
}

#[test]
fn json_shows_phase_states() {
    let temp = Project::initialized();
    let plan = temp.plan_json();

    assert_eq!(plan["operation"]["id"], "op-1");
    assert_eq!(plan["operation"]["state"], "in_progress");
    assert_eq!(phase_state(&plan, "/masters/node-1"), "unstarted");
    assert_eq!(phase_state(&plan, "/health"), "unstarted");
}

#[test]
fn progress_tracks_completed_phases() {
    let temp = Project::initialized();
    temp.orbit()
        .args(["plan", "execute", "/masters/node-1"])
        .passes();

    temp.orbit()
        .args(["plan"])
        .passes()
        .stdout_has("Progress: 1/3 phases completed");
}
