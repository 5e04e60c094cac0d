// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::ssh::shell_join;
use super::*;
use orbit_core::{ClusterRole, RunnerConfig, RunnerKind};
use std::time::{Duration, Instant};

fn node() -> Server {
    Server::new("node-1", "10.0.0.1", ClusterRole::Master)
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn connection_failures_are_transient() {
    let spawn = RunnerError::Spawn {
        target: "node-1".to_string(),
        program: "ssh".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
    };
    let exit = |connection| RunnerError::Exit {
        target: "node-1".to_string(),
        code: Some(1),
        output: "boom".to_string(),
        connection,
    };
    assert!(spawn.is_transient());
    assert!(exit(true).is_transient());
    assert!(!exit(false).is_transient());
    assert!(!RunnerError::Cancelled {
        target: "node-1".to_string()
    }
    .is_transient());
    assert_eq!(exit(false).output(), Some("boom"));
}

#[test]
fn exit_error_names_target_and_status() {
    let err = RunnerError::Exit {
        target: "node-1 (10.0.0.1)".to_string(),
        code: Some(3),
        output: "no such unit".to_string(),
        connection: false,
    };
    assert_eq!(
        err.to_string(),
        "command on node-1 (10.0.0.1) exited with status 3: no such unit"
    );
}

#[test]
fn shell_join_quotes_only_when_needed() {
    assert_eq!(
        shell_join(&args(&["planet", "leader", "--public-ip=10.0.0.1"])),
        "planet leader --public-ip=10.0.0.1"
    );
    assert_eq!(shell_join(&args(&["sh", "-c", "echo hi"])), "sh -c 'echo hi'");
    assert_eq!(shell_join(&args(&["it's"])), r"'it'\''s'");
    assert_eq!(shell_join(&args(&[""])), "''");
}

#[test]
fn ssh_command_line_targets_advertise_ip() {
    let runner = SshRunner::new("ssh")
        .with_options(args(&["-o", "BatchMode=yes"]))
        .with_user("root");
    assert_eq!(
        runner.command_line(&node(), &args(&["systemctl", "restart", "planet"])),
        args(&[
            "-o",
            "BatchMode=yes",
            "root@10.0.0.1",
            "--",
            "systemctl restart planet"
        ])
    );
}

#[tokio::test]
async fn local_runner_returns_stdout() {
    let output = LocalRunner::new()
        .run(
            &CancellationToken::new(),
            &tracing::Span::none(),
            &node(),
            &args(&["sh", "-c", "echo hello"]),
        )
        .await
        .unwrap();
    assert_eq!(output, b"hello\n");
}

#[tokio::test]
async fn local_runner_reports_exit_status_and_output() {
    let err = LocalRunner::new()
        .run(
            &CancellationToken::new(),
            &tracing::Span::none(),
            &node(),
            &args(&["sh", "-c", "echo oops >&2; exit 3"]),
        )
        .await
        .unwrap_err();
    match &err {
        RunnerError::Exit {
            code,
            output,
            connection,
            ..
        } => {
            assert_eq!(*code, Some(3));
            assert_eq!(output, "oops");
            assert!(!connection);
        }
        other => panic!("expected exit error, got {:?}", other),
    }
    assert!(!err.is_transient());
}

#[tokio::test]
async fn missing_program_is_transient_spawn_error() {
    let err = LocalRunner::new()
        .run(
            &CancellationToken::new(),
            &tracing::Span::none(),
            &node(),
            &args(&["/nonexistent/orbit-test-binary"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Spawn { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn cancellation_stops_in_flight_command() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = LocalRunner::new()
        .run(
            &cancel,
            &tracing::Span::none(),
            &node(),
            &args(&["sleep", "30"]),
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn ssh_exit_255_is_a_connection_failure() {
    // `sh -c 'exit 255' <dest> -- <cmd>` stands in for an unreachable host
    let runner = SshRunner::new("sh").with_options(args(&["-c", "echo unreachable >&2; exit 255"]));
    let err = runner
        .run(
            &CancellationToken::new(),
            &tracing::Span::none(),
            &node(),
            &args(&["true"]),
        )
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.output(), Some("unreachable"));
}

#[tokio::test]
async fn noop_runner_succeeds_without_running() {
    let output = NoOpRunner::new()
        .run(
            &CancellationToken::new(),
            &tracing::Span::none(),
            &node(),
            &args(&["rm", "-rf", "/"]),
        )
        .await
        .unwrap();
    assert!(output.is_empty());
}

#[test]
fn configured_runner_follows_config_kind() {
    for kind in [RunnerKind::Ssh, RunnerKind::Local, RunnerKind::Noop] {
        let config = RunnerConfig {
            kind,
            ..RunnerConfig::default()
        };
        assert_eq!(ConfiguredRunner::from_config(&config).kind(), kind);
    }
}
