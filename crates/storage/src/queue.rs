// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed queue file: encoded Job records in a locked log.

use crate::error::StorageError;
use crate::locked_log;
use kochi_core::{codec, Job, KochiHome};

/// Append an encoded job to the queue for `(job.machine, job.queue)`.
pub fn push(home: &KochiHome, job: &Job) -> Result<(), StorageError> {
    let line = codec::encode(job)?;
    locked_log::push(&home.queue_file(&job.machine, &job.queue), &line)
}

/// Pop the head job. `None` when the queue file is missing or empty.
pub fn pop(home: &KochiHome, machine: &str, queue: &str) -> Result<Option<Job>, StorageError> {
    match locked_log::pop(&home.queue_file(machine, queue))? {
        Some(line) => Ok(Some(codec::decode(&line)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
