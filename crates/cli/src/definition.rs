// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan definition files read by `orbit init`
//!
//! ```toml
//! operation = "update"
//! cluster = "example.com"
//!
//! [[servers]]
//! hostname = "node-1"
//! advertise_ip = "10.0.0.1"
//! role = "master"
//!
//! [[phases]]
//! id = "/masters"
//! description = "Update masters"
//!
//! [[phases.phases]]
//! id = "/masters/node-1"
//! executor = "command"
//! server = "node-1"
//! details = { command = "systemctl restart kubelet" }
//! ```

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use orbit_core::{ClusterRole, OperationPlan, OperationType, Phase, PhaseData, Server};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDefinition {
    pub operation: OperationType,
    pub cluster: String,
    /// Generated when omitted
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub servers: Vec<ServerDefinition>,
    pub phases: Vec<PhaseDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerDefinition {
    pub hostname: String,
    pub advertise_ip: String,
    #[serde(default = "default_role")]
    pub role: ClusterRole,
}

fn default_role() -> ClusterRole {
    ClusterRole::Node
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseDefinition {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub executor: Option<String>,
    /// Hostname of one of the plan's servers
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    #[serde(default)]
    pub phases: Vec<PhaseDefinition>,
}

impl PlanDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build and validate the base plan
    pub fn into_plan(self, operation_id: String, created: DateTime<Utc>) -> Result<OperationPlan> {
        let servers: Vec<Server> = self
            .servers
            .iter()
            .map(|s| Server::new(&s.hostname, &s.advertise_ip, s.role))
            .collect();

        let mut phases = Vec::with_capacity(self.phases.len());
        for def in self.phases {
            phases.push(build_phase(def, &servers)?);
        }

        let plan = OperationPlan::new(operation_id, self.operation, self.cluster, created)
            .with_servers(servers)
            .with_phases(phases);
        plan.validate()?;
        Ok(plan)
    }
}

fn build_phase(def: PhaseDefinition, servers: &[Server]) -> Result<Phase> {
    let server = match &def.server {
        Some(hostname) => match servers.iter().find(|s| &s.hostname == hostname) {
            Some(server) => Some(server.clone()),
            None => bail!("phase {} references unknown server {}", def.id, hostname),
        },
        None => None,
    };

    let mut phase = Phase::new(def.id, def.description).with_requires(def.requires);
    if let Some(executor) = def.executor {
        phase = phase.with_executor(executor);
    }
    if server.is_some() || def.package.is_some() || !def.details.is_empty() {
        phase.data = Some(PhaseData {
            server,
            package: def.package,
            details: def.details,
        });
    }

    let mut children = Vec::with_capacity(def.phases.len());
    for child in def.phases {
        children.push(build_phase(child, servers)?);
    }
    Ok(phase.with_phases(children))
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
