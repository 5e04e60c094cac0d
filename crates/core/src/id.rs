// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation and machine identifiers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates operation identifiers
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-based generator used for real operations
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Predictable generator for tests: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("op")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

/// Identifier recorded on every changelog write, so entries appended by
/// different controllers can be told apart.
///
/// Uses `ORBIT_MACHINE_ID` when set, otherwise the host name plus a random
/// suffix.
pub fn machine_id() -> String {
    if let Ok(id) = std::env::var("ORBIT_MACHINE_ID") {
        if !id.is_empty() {
            return id;
        }
    }
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "controller".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", host, &suffix[..8])
}
