// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation request flags.
//!
//! Presence of the sentinel file is the whole signal: the watcher of a
//! running job interrupts its process group, and readers of a WAITING
//! job state synthesize CANCELED.

use crate::error::StorageError;
use kochi_core::KochiHome;

/// Request cancellation of a job.
pub fn request(home: &KochiHome, machine: &str, job_id: u64) -> Result<(), StorageError> {
    let path = home.job_cancelreq(machine, job_id);
    std::fs::write(&path, "canceled").map_err(StorageError::io(&path))
}

/// Whether cancellation has been requested for a job.
pub fn is_requested(home: &KochiHome, machine: &str, job_id: u64) -> bool {
    home.job_cancelreq(machine, job_id).exists()
}
