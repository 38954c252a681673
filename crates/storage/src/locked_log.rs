// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only line log with pop-head semantics, protected by `flock`.
//!
//! `push` appends one line; `pop` removes and returns the head line and
//! rewrites the remainder with truncation. Concurrent workers competing on
//! the same file each receive a distinct head.

use crate::error::StorageError;
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Append `line` to the log, creating the file if needed.
pub fn push(path: &Path, line: &str) -> Result<(), StorageError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(StorageError::io(path))?;
    file.lock_exclusive().map_err(StorageError::io(path))?;
    writeln!(file, "{line}").map_err(StorageError::io(path))?;
    Ok(())
}

/// Remove and return the head line. Returns `None` when the file is
/// missing or empty. Trailing NULs left by crashed writers are stripped.
pub fn pop(path: &Path) -> Result<Option<String>, StorageError> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::Io { path: path.to_path_buf(), source: e }),
    };
    file.lock_exclusive().map_err(StorageError::io(path))?;

    let mut content = String::new();
    file.read_to_string(&mut content).map_err(StorageError::io(path))?;
    if content.is_empty() {
        return Ok(None);
    }

    let (head, rest) = match content.split_once('\n') {
        Some((head, rest)) => (head, rest),
        None => (content.as_str(), ""),
    };
    let head = head.trim_end_matches('\0').to_string();

    file.set_len(0).map_err(StorageError::io(path))?;
    file.seek(SeekFrom::Start(0)).map_err(StorageError::io(path))?;
    file.write_all(rest.as_bytes()).map_err(StorageError::io(path))?;
    Ok(Some(head))
}

#[cfg(test)]
#[path = "locked_log_tests.rs"]
mod tests;
