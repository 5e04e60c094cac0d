// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};

#[test]
fn new_operation_is_in_progress() {
    let clock = FakeClock::new();
    let op = Operation::new("op-1", "example.com", OperationType::Expand, &clock);
    assert_eq!(op.state, OperationState::InProgress);
    assert_eq!(op.created, clock.now());
    assert!(!op.is_finished());
}

#[test]
fn serializes_type_under_its_wire_name() {
    let clock = FakeClock::new();
    let op = Operation::new("op-1", "example.com", OperationType::Uninstall, &clock);
    let json = serde_json::to_value(&op).unwrap();
    assert_eq!(json["type"], "uninstall");
    assert_eq!(json["state"], "in_progress");

    let back: Operation = serde_json::from_value(json).unwrap();
    assert_eq!(back, op);
}

#[yare::parameterized(
    in_progress = { OperationState::InProgress, "in_progress" },
    completed = { OperationState::Completed, "completed" },
    failed = { OperationState::Failed, "failed" },
)]
fn state_display_matches_wire_name(state: OperationState, name: &str) {
    assert_eq!(state.to_string(), name);
    assert_eq!(serde_json::to_value(state).unwrap(), name);
}
