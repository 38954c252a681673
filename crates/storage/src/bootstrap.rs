// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-level directory and counter bootstrap.

use crate::counter;
use crate::error::StorageError;
use kochi_core::KochiHome;
use std::path::Path;

/// Create the projects directory.
pub fn ensure_home(home: &KochiHome) -> Result<(), StorageError> {
    mkdirs(&home.projects_dir())
}

/// Create the per-machine queue/worker/job directories and initialize the
/// id and min-active counters when absent.
pub fn ensure_machine(home: &KochiHome, machine: &str) -> Result<(), StorageError> {
    mkdirs(&home.queue_dir(machine))?;
    mkdirs(&home.worker_dir(machine))?;
    mkdirs(&home.job_dir(machine))?;
    counter::ensure_init(&home.worker_counter(machine))?;
    counter::ensure_init(&home.worker_min_active(machine))?;
    counter::ensure_init(&home.job_counter(machine))?;
    counter::ensure_init(&home.job_min_active(machine))?;
    Ok(())
}

fn mkdirs(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(StorageError::io(path))
}
