// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process execution shared by the local and SSH runners

use super::RunnerError;
use orbit_core::Server;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Run `cmd` to completion unless `cancel` fires first.
///
/// `connection_exit` is the exit status that means the transport failed.
pub(super) async fn run_to_completion(
    cancel: &CancellationToken,
    target: &Server,
    program: &str,
    mut cmd: Command,
    connection_exit: Option<i32>,
) -> Result<Vec<u8>, RunnerError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Dropping the output future drops the child, which kills it
    let output = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::warn!(node = %target, "cancelled, killing command");
            return Err(RunnerError::Cancelled { target: target.to_string() });
        }
        output = cmd.output() => output,
    };

    let output = output.map_err(|source| RunnerError::Spawn {
        target: target.to_string(),
        program: program.to_string(),
        source,
    })?;

    if output.status.success() {
        return Ok(output.stdout);
    }

    let code = output.status.code();
    let mut combined = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(stdout.trim());
    }
    Err(RunnerError::Exit {
        target: target.to_string(),
        code,
        output: combined,
        connection: connection_exit.is_some() && code == connection_exit,
    })
}
