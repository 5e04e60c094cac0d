// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for black-box CLI specs

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Local runner with a short retry budget so failures surface quickly
pub const FAST_CONFIG: &str = r#"
[runner]
kind = "local"

[retry]
initial_interval = "10ms"
max_interval = "50ms"
max_elapsed_time = "200ms"
"#;

/// Two nodes; node-2 runs after node-1, then a final check
pub const TWO_NODE_PLAN: &str = r#"
operation = "update"
cluster = "example.com"
id = "op-1"

[[servers]]
hostname = "node-1"
advertise_ip = "127.0.0.1"
role = "master"

[[servers]]
hostname = "node-2"
advertise_ip = "127.0.0.2"
role = "master"

[[phases]]
id = "/masters"
description = "Update masters"

[[phases.phases]]
id = "/masters/node-1"
description = "Update node-1"
executor = "command"
server = "node-1"
details = { command = "echo node-1 >> trace", rollback = "echo undo-1 >> trace" }

[[phases.phases]]
id = "/masters/node-2"
description = "Update node-2"
executor = "command"
server = "node-2"
requires = ["/masters/node-1"]
details = { command = "echo node-2 >> trace", rollback = "echo undo-2 >> trace" }

[[phases]]
id = "/health"
description = "Check health"
executor = "command"
server = "node-1"
requires = ["/masters"]
details = { command = "test -f trace" }
"#;

/// A temporary state directory with a config file
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        project.file("orbit.toml", FAST_CONFIG);
        project
    }

    /// A project with [`TWO_NODE_PLAN`] already initialized
    pub fn initialized() -> Self {
        let project = Self::empty();
        project.file("plan.toml", TWO_NODE_PLAN);
        project.orbit().args(["init", "plan.toml"]).passes();
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.path().join("state")
    }

    pub fn file(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap_or_default()
    }

    /// The orbit binary, run from the project directory
    pub fn orbit(&self) -> CliBuilder {
        let mut cmd = Command::cargo_bin("orbit").unwrap();
        cmd.current_dir(self.path())
            .env_remove("ORBIT_CONFIG")
            .env("ORBIT_LOG", "debug")
            .arg("--state-dir")
            .arg(self.state_dir())
            .arg("--config")
            .arg(self.path().join("orbit.toml"));
        CliBuilder { cmd }
    }

    /// `orbit plan --format json`, parsed
    pub fn plan_json(&self) -> serde_json::Value {
        let out = self
            .orbit()
            .args(["plan", "--format", "json"])
            .passes()
            .stdout();
        serde_json::from_str(&out).unwrap()
    }
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert::new(output);
        assert!(
            run.success,
            "expected success\nstdout:\n{}\nstderr:\n{}",
            run.stdout, run.stderr
        );
        run
    }

    pub fn fails(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert::new(output);
        assert!(
            !run.success,
            "expected failure\nstdout:\n{}\nstderr:\n{}",
            run.stdout, run.stderr
        );
        run
    }
}

pub struct RunAssert {
    success: bool,
    stdout: String,
    stderr: String,
}

impl RunAssert {
    fn new(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn stdout(&self) -> String {
        self.stdout.clone()
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout, expected);
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout.contains(needle),
            "stdout missing {:?}:\n{}",
            needle,
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr.contains(needle),
            "stderr missing {:?}:\n{}",
            needle,
            self.stderr
        );
        self
    }
}

/// State of `phase` in `plan --format json` output
pub fn phase_state(plan: &serde_json::Value, phase: &str) -> String {
    fn find<'a>(phases: &'a serde_json::Value, id: &str) -> Option<&'a serde_json::Value> {
        phases.as_array()?.iter().find_map(|p| {
            if p["id"] == id {
                Some(p)
            } else {
                find(&p["phases"], id)
            }
        })
    }
    find(&plan["plan"]["phases"], phase)
        .and_then(|p| p["state"].as_str())
        .unwrap_or_default()
        .to_string()
}
