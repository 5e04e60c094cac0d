// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_config_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.retry.initial_interval, Duration::from_millis(500));
    assert_eq!(config.engine.parallelism, 1);
    assert_eq!(config.runner.kind, RunnerKind::Ssh);
}

#[test]
fn durations_parse_humantime() {
    let config = Config::parse(
        r#"
[retry]
initial_interval = "100ms"
max_elapsed_time = "2s"

[engine]
parallelism = 4
election_wait_timeout = "5m"
"#,
    )
    .unwrap();
    assert_eq!(config.retry.initial_interval, Duration::from_millis(100));
    assert_eq!(config.retry.max_elapsed_time, Duration::from_secs(2));
    assert_eq!(config.retry.multiplier, 1.5);
    assert_eq!(config.engine.parallelism, 4);
    assert_eq!(config.engine.election_wait_timeout, Duration::from_secs(300));
}

#[test]
fn runner_section_parses() {
    let config = Config::parse(
        r#"
[runner]
kind = "local"
"#,
    )
    .unwrap();
    assert_eq!(config.runner.kind, RunnerKind::Local);
    assert_eq!(config.runner.program, "ssh");
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(Config::parse("[retry]\nbogus = 1\n").is_err());
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("orbit.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn malformed_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orbit.toml");
    std::fs::write(&path, "retry = [").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("orbit.toml"));
}

#[test]
fn explicit_state_dir_wins() {
    let config = Config {
        state_dir: Some(PathBuf::from("/var/lib/orbit")),
        ..Config::default()
    };
    assert_eq!(config.state_dir().unwrap(), PathBuf::from("/var/lib/orbit"));
}
