// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic integer counter in a file, protected by `flock`.
//!
//! The file holds a single decimal integer. Every operation takes an
//! exclusive advisory lock for the duration of its read-modify-write and
//! rewrites the full content with truncation, so concurrent processes on
//! the same filesystem see a strictly serialized counter.

use crate::error::StorageError;
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Reset the counter to `value`, creating the file if needed.
pub fn reset(path: &Path, value: u64) -> Result<(), StorageError> {
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
    write!(file, "{value}").map_err(StorageError::io(path))?;
    Ok(())
}

/// Read the current value. Fails if the counter was never initialized.
pub fn fetch(path: &Path) -> Result<u64, StorageError> {
    let mut file = open_existing(path)?;
    file.lock_exclusive().map_err(StorageError::io(path))?;
    read_value(&mut file, path)
}

/// Return the current value and store `current + delta`.
pub fn fetch_and_add(path: &Path, delta: u64) -> Result<u64, StorageError> {
    let mut file = open_existing(path)?;
    file.lock_exclusive().map_err(StorageError::io(path))?;
    let current = read_value(&mut file, path)?;
    file.set_len(0).map_err(StorageError::io(path))?;
    file.seek(SeekFrom::Start(0)).map_err(StorageError::io(path))?;
    write!(file, "{}", current + delta).map_err(StorageError::io(path))?;
    Ok(current)
}

/// Initialize the counter to 0 unless it already holds a valid value.
pub fn ensure_init(path: &Path) -> Result<(), StorageError> {
    match fetch(path) {
        Ok(_) => Ok(()),
        Err(_) => reset(path, 0),
    }
}

fn open_existing(path: &Path) -> Result<std::fs::File, StorageError> {
    OpenOptions::new().read(true).write(true).open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::Missing(path.to_path_buf())
        } else {
            StorageError::Io { path: path.to_path_buf(), source: e }
        }
    })
}

fn read_value(file: &mut std::fs::File, path: &Path) -> Result<u64, StorageError> {
    let mut content = String::new();
    file.read_to_string(&mut content).map_err(StorageError::io(path))?;
    content
        .trim()
        .parse()
        .map_err(|_| StorageError::CorruptCounter(path.to_path_buf()))
}

#[cfg(test)]
#[path = "counter_tests.rs"]
mod tests;
