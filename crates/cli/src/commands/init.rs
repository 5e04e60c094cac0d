// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbit init`: record a new operation and its plan

use anyhow::{Context, Result};
use clap::Args;
use orbit_core::{Clock, IdGen, Operation, SystemClock, UuidIdGen};
use orbit_storage::Backend;
use std::path::{Path, PathBuf};

use crate::adapters::open_backend;
use crate::definition::PlanDefinition;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Plan definition file (TOML)
    pub plan_file: PathBuf,
}

/// Creates the operation and prints its ID
pub fn handle(args: InitArgs, state_dir: &Path) -> Result<()> {
    let definition = PlanDefinition::load(&args.plan_file)?;
    let clock = SystemClock;
    let id = definition.id.clone().unwrap_or_else(|| UuidIdGen.next());
    let operation = Operation::new(&id, &definition.cluster, definition.operation, &clock);
    let plan = definition.into_plan(id.clone(), clock.now())?;

    let backend = open_backend(state_dir)?;
    backend
        .create_operation(&operation)
        .with_context(|| format!("failed to create operation {}", id))?;
    backend
        .create_operation_plan(&plan)
        .with_context(|| format!("failed to store plan for operation {}", id))?;

    tracing::info!(
        operation_id = %id,
        cluster = %operation.site_domain,
        phases = plan.total_steps(),
        "operation initialized"
    );
    println!("{}", id);
    Ok(())
}
