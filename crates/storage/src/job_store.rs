// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job persistent state file.
//!
//! Writers hold an exclusive lock for each read-modify-write. Readers
//! synthesize two states that are never stored directly: a WAITING job
//! whose cancel flag exists reads as CANCELED, and a RUNNING job whose
//! worker heartbeat reads as TERMINATED (or is missing) reads as KILLED.

use crate::error::StorageError;
use crate::{cancel, heartbeat};
use fs2::FileExt;
use kochi_core::{
    codec, InstallState, Job, JobState, KochiHome, RunningState, HEARTBEAT_MARGIN_SECS,
};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Write the initial WAITING state. Called before the job is appended to
/// the queue, so a popped job always has a state file.
pub fn init(
    home: &KochiHome,
    job: &Job,
    dependency_states: Vec<InstallState>,
    now: u64,
) -> Result<(), StorageError> {
    let path = home.job_state(&job.machine, job.id);
    let state = JobState::waiting(job, dependency_states, now);
    let encoded = codec::encode(&state)?;
    std::fs::write(&path, encoded).map_err(StorageError::io(&path))
}

/// Transition to RUNNING, stamping the worker and effective environment.
pub fn on_start(
    home: &KochiHome,
    machine: &str,
    job_id: u64,
    worker_id: u64,
    envs: indexmap::IndexMap<String, String>,
    build_executed: bool,
    now: u64,
) -> Result<(), StorageError> {
    update(&home.job_state(machine, job_id), |state| {
        state.on_start(worker_id, envs, build_executed, now);
    })
}

/// Transition to a terminal state.
pub fn on_finish(
    home: &KochiHome,
    machine: &str,
    job_id: u64,
    outcome: RunningState,
    now: u64,
) -> Result<(), StorageError> {
    update(&home.job_state(machine, job_id), |state| {
        state.on_finish(outcome, now);
    })
}

/// Rewrite a skipped WAITING job as CANCELED (worker-side acknowledgement
/// of the cancel flag).
pub fn mark_canceled(
    home: &KochiHome,
    machine: &str,
    job_id: u64,
    now: u64,
) -> Result<(), StorageError> {
    update(&home.job_state(machine, job_id), |state| {
        state.on_finish(RunningState::Canceled, now);
    })
}

/// Read the state with reader-side synthesis applied. The on-disk record
/// is never modified here.
pub fn get(home: &KochiHome, machine: &str, job_id: u64, now: u64) -> JobState {
    let path = home.job_state(machine, job_id);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return JobState::invalid(),
    };
    let mut state: JobState = match codec::decode(&content) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "undecodable job state");
            return JobState::invalid();
        }
    };

    match state.running_state {
        RunningState::Waiting if cancel::is_requested(home, machine, job_id) => {
            state.running_state = RunningState::Canceled;
        }
        RunningState::Running => {
            if let Some(worker_id) = state.worker_id {
                let hb = heartbeat::read(
                    &home.worker_heartbeat(machine, worker_id),
                    HEARTBEAT_MARGIN_SECS,
                    now,
                );
                match hb.running_state {
                    RunningState::Running => state.latest_time = Some(now),
                    RunningState::Terminated | RunningState::Invalid => {
                        state.running_state = RunningState::Killed;
                        if hb.running_state == RunningState::Terminated {
                            state.latest_time = Some(hb.latest_time);
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    state
}

fn update(path: &Path, apply: impl FnOnce(&mut JobState)) -> Result<(), StorageError> {
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
    let mut state: JobState = codec::decode(&content)?;
    apply(&mut state);
    let encoded = codec::encode(&state)?;

    file.set_len(0).map_err(StorageError::io(path))?;
    file.seek(SeekFrom::Start(0)).map_err(StorageError::io(path))?;
    file.write_all(encoded.as_bytes()).map_err(StorageError::io(path))?;
    Ok(())
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
