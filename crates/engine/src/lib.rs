// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orbit-engine: drives operation plans
//!
//! The [`Fsm`] resolves a plan from the changelog, picks phases whose
//! requirements are met and runs them through executors built by the
//! [`ExecutorRegistry`], retrying transient failures under a [`RetryPolicy`].

mod error;
mod executor;
mod fsm;
mod lookup;
pub mod phases;
mod retry;

#[cfg(test)]
mod test_helpers;

pub use error::{FsmError, PhaseError};
pub use executor::{
    ExecutorFactory, ExecutorParams, ExecutorRegistry, PhaseExecutor, Progress, ProgressSink,
    StepReport,
};
pub use fsm::{Fsm, FsmDeps, PhaseParams};
pub use lookup::get_operation_plan;
pub use retry::{RetryPolicy, TransientPredicate};
