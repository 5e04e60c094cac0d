// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-enables leader election on every master once the phase's server is up

use crate::error::PhaseError;
use crate::executor::{ExecutorParams, PhaseExecutor, Progress};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use orbit_adapters::CommandRunner;
use orbit_core::Server;
use tokio_util::sync::CancellationToken;

pub struct ElectionExecutor<R> {
    server: Server,
    masters: Vec<Server>,
    cluster_name: String,
    runner: R,
    progress: Progress,
    retry: RetryPolicy,
    span: tracing::Span,
}

impl<R: CommandRunner> ElectionExecutor<R> {
    pub fn new(params: ExecutorParams<R>) -> Result<Self, PhaseError> {
        let server = params.server()?.clone();
        let masters = params
            .plan
            .servers
            .iter()
            .filter(|s| s.is_master())
            .cloned()
            .collect();
        let retry = params
            .retry
            .clone()
            .with_max_elapsed_time(params.config.election_wait_timeout);
        Ok(Self {
            server,
            masters,
            cluster_name: params.plan.cluster_name.clone(),
            runner: params.runner,
            progress: params.progress,
            retry,
            span: params.span,
        })
    }

    /// `planet leader resume` arguments for one master
    pub fn resume_args(cluster_name: &str, master: &Server) -> Vec<String> {
        vec![
            "planet".to_string(),
            "leader".to_string(),
            "resume".to_string(),
            format!("--public-ip={}", master.advertise_ip),
            format!("--election-key=/planet/cluster/{}/election", cluster_name),
            "--etcd-cafile=/var/state/root.cert".to_string(),
            "--etcd-certfile=/var/state/etcd.cert".to_string(),
            "--etcd-keyfile=/var/state/etcd.key".to_string(),
        ]
    }

    async fn resume_leader(
        &self,
        cancel: &CancellationToken,
        master: &Server,
    ) -> Result<(), PhaseError> {
        let args = Self::resume_args(&self.cluster_name, master);
        self.runner
            .run(cancel, &self.span, &self.server, &args)
            .await
            .map(|_| ())
            .map_err(|e| {
                let output = e.output().unwrap_or_default().to_string();
                PhaseError::from(e).context(format!(
                    "failed to enable election for master {}. reason: {}",
                    master.advertise_ip, output
                ))
            })
    }
}

#[async_trait]
impl<R: CommandRunner> PhaseExecutor for ElectionExecutor<R> {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), PhaseError> {
        self.progress.next_step("Enable leader elections");

        for master in &self.masters {
            let name = format!("resume leader {}", master.advertise_ip);
            // The election wait is the whole budget; the engine must not
            // retry the phase on top of it
            self.retry
                .run(cancel, &name, || self.resume_leader(cancel, master))
                .await
                .map_err(PhaseError::into_permanent)?;
        }
        Ok(())
    }

    async fn rollback(&self, _cancel: &CancellationToken) -> Result<(), PhaseError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "election_tests.rs"]
mod tests;
