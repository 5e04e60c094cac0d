// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in phase executors

mod command;
mod election;

pub use command::CommandExecutor;
pub use election::ElectionExecutor;

use crate::executor::{ExecutorRegistry, PhaseExecutor};
use orbit_adapters::CommandRunner;

pub const ELECTION: &str = "election";
pub const COMMAND: &str = "command";

pub(crate) fn register_builtin<R: CommandRunner>(registry: &mut ExecutorRegistry<R>) {
    registry
        .register(ELECTION, |params| {
            Ok(Box::new(ElectionExecutor::new(params)?) as Box<dyn PhaseExecutor>)
        })
        .register(COMMAND, |params| {
            Ok(Box::new(CommandExecutor::new(params)?) as Box<dyn PhaseExecutor>)
        });
}
