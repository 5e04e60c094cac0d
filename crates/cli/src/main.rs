// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! orbit - cluster operation plans

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod adapters;
mod commands;
mod completions;
mod definition;
mod error;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{init, plan};
use orbit_core::Config;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::completions::{generate_completions, CompletionsArgs};
use crate::error::OrbitError;

const CONFIG_ENV: &str = "ORBIT_CONFIG";

#[derive(Parser)]
#[command(
    name = "orbit",
    version,
    about = "Orbit - step-by-step cluster operations"
)]
struct Cli {
    /// Directory holding operation state and logs
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an operation from a plan definition
    Init(init::InitArgs),
    /// Show or drive the current operation plan
    Plan(plan::PlanArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<OrbitError>() {
                Some(err) => eprint!("{}", err),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = cli.command {
        generate_completions::<Cli>(args.shell);
        return Ok(());
    }

    let config = load_config(cli.config)?;
    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => config.state_dir()?,
    };
    let _guard = logging::setup_logging(&state_dir)?;

    match cli.command {
        Commands::Init(args) => init::handle(args, &state_dir),
        Commands::Plan(args) => plan::handle(args, &config, &state_dir).await,
        Commands::Completions(_) => Ok(()),
    }
}

/// An explicit path must exist; the default location is optional
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Ok(Config::load(&path)?);
    }
    match dirs::config_dir() {
        Some(dir) => Ok(Config::load(&dir.join("orbit").join("config.toml"))?),
        None => Ok(Config::default()),
    }
}
