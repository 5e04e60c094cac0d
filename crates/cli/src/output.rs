// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use orbit_core::{Operation, OperationPlan, Phase};
use orbit_engine::{ProgressSink, StepReport};
use serde::Serialize;
use std::fmt::{self, Write as _};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// An operation with its resolved plan
#[derive(Serialize)]
pub struct PlanView<'a> {
    pub operation: &'a Operation,
    pub plan: &'a OperationPlan,
}

impl fmt::Display for PlanView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.operation;
        writeln!(
            f,
            "Operation: {} ({}, {}) {}",
            op.id, op.operation_type, op.site_domain, op.state
        )?;
        writeln!(f)?;
        writeln!(f, "{:<40} {:<12} DESCRIPTION", "PHASE", "STATE")?;
        for phase in &self.plan.phases {
            write_phase(f, phase, 0)?;
        }
        let (done, total) = self.plan.progress();
        writeln!(f)?;
        writeln!(f, "Progress: {}/{} phases completed", done, total)
    }
}

fn write_phase(f: &mut fmt::Formatter<'_>, phase: &Phase, depth: usize) -> fmt::Result {
    let mut label = String::new();
    let _ = write!(label, "{}{}", "  ".repeat(depth), phase.id);
    writeln!(f, "{:<40} {:<12} {}", label, phase.state, phase.description)?;
    if let Some(error) = &phase.error {
        writeln!(f, "{}  error: {}", "  ".repeat(depth), error)?;
    }
    for child in &phase.phases {
        write_phase(f, child, depth + 1)?;
    }
    Ok(())
}

/// Prints executor steps as they happen
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, step: &StepReport) {
        println!("[{}/{}] {}", step.step, step.total, step.message);
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
