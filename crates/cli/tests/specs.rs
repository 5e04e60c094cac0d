// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box behavior tests for the orbit CLI.
//!
//! These tests are black-box: they invoke the binary against a temporary
//! state directory and check stdout, stderr and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli.rs"]
mod cli;
#[path = "specs/init.rs"]
mod init;
#[path = "specs/plan_execute.rs"]
mod plan_execute;
#[path = "specs/plan_rollback.rs"]
mod plan_rollback;
#[path = "specs/plan_show.rs"]
mod plan_show;
