// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orbit-storage: durable backends for operations, plans and changelogs
//!
//! Every backend stores the same records; state is a pure function of the
//! records applied so far.

mod backend;
mod error;
mod file;
mod memory;
mod state;
mod wal;

pub use backend::{AppendGuard, Backend};
pub use error::StorageError;
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use state::{MaterializedState, Record};
pub use wal::{WalEntry, WalReader, WalWriter};
