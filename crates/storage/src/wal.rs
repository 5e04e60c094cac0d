// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log
//!
//! One JSON entry per line. Every entry carries a CRC32 of its record; a
//! line that fails to parse or verify marks the end of the valid log.

use crate::error::StorageError;
use crate::state::Record;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single entry in the write-ahead log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Strictly increasing across the whole log
    pub sequence: u64,
    /// Microseconds since Unix epoch
    pub timestamp_micros: u64,
    /// Host that wrote the entry
    pub machine_id: String,
    pub record: Record,
    /// CRC32 of the serialized record
    pub checksum: u32,
}

impl WalEntry {
    pub fn new(sequence: u64, machine_id: &str, record: Record) -> Self {
        let timestamp_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self {
            sequence,
            timestamp_micros,
            machine_id: machine_id.to_string(),
            checksum: Self::calculate_checksum(&record),
            record,
        }
    }

    fn calculate_checksum(record: &Record) -> u32 {
        // Records hold only strings, maps and timestamps, so serialization
        // does not fail in practice
        let json = serde_json::to_string(record).unwrap_or_default();
        crc32fast::hash(json.as_bytes())
    }

    pub fn verify(&self) -> bool {
        self.checksum == Self::calculate_checksum(&self.record)
    }

    pub fn to_line(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(StorageError::from)
    }

    pub fn from_line(line: &[u8]) -> Result<Self, StorageError> {
        serde_json::from_slice(line).map_err(StorageError::from)
    }
}

/// Appends entries with fsync
pub struct WalWriter {
    file: File,
    machine_id: String,
}

impl WalWriter {
    pub fn open(path: &Path, machine_id: &str) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            machine_id: machine_id.to_string(),
        })
    }

    /// Append a record; returns the entry and the number of bytes written.
    /// The entry is on disk before this returns.
    pub fn append(
        &mut self,
        sequence: u64,
        record: Record,
    ) -> Result<(WalEntry, u64), StorageError> {
        let entry = WalEntry::new(sequence, &self.machine_id, record);
        let mut line = entry.to_line()?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_all()?;
        Ok((entry, line.len() as u64))
    }

    /// Cut the log at `len` bytes, dropping a corrupt tail
    pub fn truncate(&mut self, len: u64) -> Result<(), StorageError> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        Ok(())
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }
}

/// Valid entries read from some byte offset onward
#[derive(Debug, Default)]
pub struct WalBatch {
    pub entries: Vec<WalEntry>,
    /// Byte offset just past the last valid entry
    pub end: u64,
    /// Set when reading stopped at an invalid line
    pub corruption: Option<StorageError>,
}

/// Reads entries starting at a byte offset
pub struct WalReader {
    path: PathBuf,
}

impl WalReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every valid entry from `offset` to the end of the log
    pub fn read_from(&self, offset: u64) -> Result<WalBatch, StorageError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(WalBatch {
                    end: offset,
                    ..WalBatch::default()
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(offset))?;

        let mut batch = WalBatch {
            end: offset,
            ..WalBatch::default()
        };
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)? as u64;
            if n == 0 {
                break;
            }
            if line.last() != Some(&b'\n') {
                batch.corruption = Some(StorageError::Corrupted {
                    offset: batch.end,
                    reason: "truncated entry".to_string(),
                });
                break;
            }
            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                batch.end += n;
                continue;
            }
            match WalEntry::from_line(trimmed) {
                Ok(entry) if entry.verify() => {
                    batch.entries.push(entry);
                    batch.end += n;
                }
                Ok(_) => {
                    batch.corruption = Some(StorageError::Corrupted {
                        offset: batch.end,
                        reason: "checksum mismatch".to_string(),
                    });
                    break;
                }
                Err(e) => {
                    batch.corruption = Some(StorageError::Corrupted {
                        offset: batch.end,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
