// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbit plan`: inspect and drive the last operation's plan

use anyhow::Result;
use clap::{Args, Subcommand};
use orbit_core::{Config, Operation};
use orbit_engine::{get_operation_plan, PhaseParams};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::adapters::{cancel_on_interrupt, make_engine, open_backend, Engine, StateBackend};
use crate::error::OrbitError;
use crate::output::{print, OutputFormat, PlanView};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: Option<PlanCommand>,

    /// Output format for `show`
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    /// Show the plan with phase states (default)
    Show,
    /// Execute a phase, or every leaf under a composite phase
    Execute {
        /// Phase ID, e.g. /masters/node-1
        phase: String,
        /// Re-run a completed phase or take over one in progress
        #[arg(long)]
        force: bool,
    },
    /// Roll back a phase
    Rollback {
        /// Phase ID
        phase: String,
        /// Skip state and dependent checks
        #[arg(long)]
        force: bool,
    },
    /// Execute all remaining phases and finish the operation
    Resume,
    /// Roll back every executed phase, dependents first
    RollbackAll,
}

pub async fn handle(args: PlanArgs, config: &Config, state_dir: &Path) -> Result<()> {
    let backend = open_backend(state_dir)?;
    let (operation, plan) = get_operation_plan(&backend).map_err(OrbitError::from)?;

    match args.command.unwrap_or(PlanCommand::Show) {
        PlanCommand::Show => {
            print(
                &PlanView {
                    operation: &operation,
                    plan: &plan,
                },
                args.format,
            );
        }
        PlanCommand::Execute { phase, force } => {
            let (engine, cancel) = engine_for(config, backend, &operation)?;
            engine
                .execute_phase(&cancel, PhaseParams::new(phase.as_str()).forced(force))
                .await
                .map_err(OrbitError::from)?;
            println!("Phase {} completed", phase);
        }
        PlanCommand::Rollback { phase, force } => {
            let (engine, cancel) = engine_for(config, backend, &operation)?;
            engine
                .rollback_phase(&cancel, PhaseParams::new(phase.as_str()).forced(force))
                .await
                .map_err(OrbitError::from)?;
            println!("Phase {} rolled back", phase);
        }
        PlanCommand::Resume => {
            let (engine, cancel) = engine_for(config, backend, &operation)?;
            engine.complete(&cancel).await.map_err(OrbitError::from)?;
            println!("Operation {} completed", operation.id);
        }
        PlanCommand::RollbackAll => {
            let (engine, cancel) = engine_for(config, backend, &operation)?;
            engine.rollback_plan(&cancel).await.map_err(OrbitError::from)?;
            println!("Operation {} rolled back", operation.id);
        }
    }
    Ok(())
}

fn engine_for(
    config: &Config,
    backend: StateBackend,
    operation: &Operation,
) -> Result<(Engine, CancellationToken)> {
    let engine = make_engine(config, backend, operation);
    let cancel = cancel_on_interrupt()?;
    Ok((engine, cancel))
}
