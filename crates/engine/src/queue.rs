// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job queue push/pop protocol.
//!
//! `push` is the enqueue-side contract: dependency consistency is checked
//! first (fail fast, nothing is written), the id is stamped from the
//! per-machine counter, the WAITING state file is created, and only then
//! is the encoded record appended, so a worker can never pop a job
//! without a state file.

use crate::installer::{self, InstallerError};
use kochi_core::{Clock, Job, KochiHome};
use kochi_storage::{counter, job_store, queue as queue_file, StorageError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Installer(#[from] InstallerError),
}

/// Enqueue a job; `machine` and `queue` must be set on the record.
/// Returns the job with its stamped id.
pub fn push<C: Clock>(home: &KochiHome, clock: &C, mut job: Job) -> Result<Job, QueueError> {
    let dependency_states = if job.context.is_some() {
        installer::check_dependencies(home, &job.project, &job.machine, &job.dependencies)?
    } else {
        Vec::new()
    };

    job.id = counter::fetch_and_add(&home.job_counter(&job.machine), 1)?;
    job_store::init(home, &job, dependency_states, clock.epoch_secs())?;
    queue_file::push(home, &job)?;
    info!(id = job.id, name = %job.name, machine = %job.machine, queue = %job.queue, "job enqueued");
    Ok(job)
}

/// Pop the head job for `(machine, queue)`; `None` when empty.
pub fn pop(home: &KochiHome, machine: &str, queue: &str) -> Result<Option<Job>, QueueError> {
    Ok(queue_file::pop(home, machine, queue)?)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
