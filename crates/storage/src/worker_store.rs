// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker persistent state file.
//!
//! The record is written at init and at exit; liveness in between comes
//! from the heartbeat, merged in on read.

use crate::error::StorageError;
use crate::heartbeat;
use fs2::FileExt;
use kochi_core::{codec, KochiHome, RunningState, WorkerState, HEARTBEAT_MARGIN_SECS};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Write the initial WAITING record.
pub fn init(
    home: &KochiHome,
    machine: &str,
    worker_id: u64,
    queue: &str,
    now: u64,
) -> Result<(), StorageError> {
    let path = home.worker_state(machine, worker_id);
    let state = WorkerState::waiting(queue, now);
    let encoded = codec::encode(&state)?;
    std::fs::write(&path, encoded).map_err(StorageError::io(&path))
}

/// Mark the worker terminated on clean exit.
pub fn finish(
    home: &KochiHome,
    machine: &str,
    worker_id: u64,
    now: u64,
) -> Result<(), StorageError> {
    update(&home.worker_state(machine, worker_id), |state| {
        state.running_state = RunningState::Terminated;
        state.latest_time = Some(now);
    })
}

/// Read the record, merged with the classified heartbeat while the stored
/// state is still active.
pub fn get(home: &KochiHome, machine: &str, worker_id: u64, now: u64) -> WorkerState {
    let path = home.worker_state(machine, worker_id);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return WorkerState::invalid(),
    };
    let mut state: WorkerState = match codec::decode(&content) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "undecodable worker state");
            return WorkerState::invalid();
        }
    };

    if state.running_state.is_active() {
        let hb = heartbeat::read(
            &home.worker_heartbeat(machine, worker_id),
            HEARTBEAT_MARGIN_SECS,
            now,
        );
        if hb.running_state != RunningState::Invalid {
            state.running_state = hb.running_state;
            state.start_time = hb.start_time;
            state.latest_time = Some(hb.latest_time);
        }
    }
    state
}

fn update(path: &Path, apply: impl FnOnce(&mut WorkerState)) -> Result<(), StorageError> {
    let mut file = OpenOptions::new().read(true).write(true).open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::Missing(path.to_path_buf())
        } else {
            StorageError::Io { path: path.to_path_buf(), source: e }
        }
    })?;
    file.lock_exclusive().map_err(StorageError::io(path))?;

    let mut content = String::new();
    file.read_to_string(&mut content).map_err(StorageError::io(path))?;
    let mut state: WorkerState = codec::decode(&content)?;
    apply(&mut state);
    let encoded = codec::encode(&state)?;

    file.set_len(0).map_err(StorageError::io(path))?;
    file.seek(SeekFrom::Start(0)).map_err(StorageError::io(path))?;
    file.write_all(encoded.as_bytes()).map_err(StorageError::io(path))?;
    Ok(())
}

#[cfg(test)]
#[path = "worker_store_tests.rs"]
mod tests;
