// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat file I/O.
//!
//! The ticker rewrites the whole record under an exclusive lock; readers
//! decode without locking and classify staleness, never writing back.

use crate::error::StorageError;
use fs2::FileExt;
use kochi_core::{codec, HeartbeatRecord, KochiHome, RunningState};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// Full rewrite of the heartbeat record.
pub fn write(path: &Path, record: &HeartbeatRecord) -> Result<(), StorageError> {
    let encoded = codec::encode(record)?;
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(StorageError::io(path))?;
    file.lock_exclusive().map_err(StorageError::io(path))?;
    file.set_len(0).map_err(StorageError::io(path))?;
    file.seek(SeekFrom::Start(0)).map_err(StorageError::io(path))?;
    file.write_all(encoded.as_bytes()).map_err(StorageError::io(path))?;
    Ok(())
}

/// Read and classify the record. A missing or undecodable file reads as
/// INVALID; a RUNNING record older than `margin` seconds reads as
/// TERMINATED. The file is never modified.
pub fn read(path: &Path, margin: u64, now: u64) -> HeartbeatRecord {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return HeartbeatRecord::invalid(),
    };
    let mut record: HeartbeatRecord = match codec::decode(&content) {
        Ok(record) => record,
        Err(_) => return HeartbeatRecord::invalid(),
    };
    record.running_state = record.classify(margin, now);
    record
}

/// Convenience accessor for a worker's classified liveness state.
pub fn worker_state(
    home: &KochiHome,
    machine: &str,
    worker_id: u64,
    margin: u64,
    now: u64,
) -> RunningState {
    read(&home.worker_heartbeat(machine, worker_id), margin, now).running_state
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
