// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-script execution.
//!
//! Scripts run as one shell pipeline in their own process group, so a
//! cancel signal reaches the whole script (and its children) without ever
//! touching the worker. Both output streams multiplex into the log tee.

use crate::tee::Tee;
use indexmap::IndexMap;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to start shell: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("script io error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a script finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    Success,
    /// Non-zero exit code.
    Failed(i32),
    /// Killed by a signal (cancellation or external interruption).
    Interrupted,
}

impl ScriptStatus {
    pub fn success(self) -> bool {
        self == ScriptStatus::Success
    }
}

/// A running script with its process-group id.
pub struct ScriptProcess {
    child: Child,
    pgid: i32,
}

/// Spawn `lines` as a single shell invocation in `cwd`.
///
/// `envs` is layered over the inherited environment. The child becomes
/// its own process-group leader.
pub fn spawn(
    lines: &[String],
    cwd: &Path,
    envs: &IndexMap<String, String>,
) -> Result<ScriptProcess, ScriptError> {
    let script = lines.join("\n");
    let mut cmd = Command::new("bash");
    cmd.arg("-c")
        .arg(script)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(ScriptError::Spawn)?;
    // pid == pgid for a fresh group leader
    let pgid = child.id().map(|id| id as i32).unwrap_or(0);
    Ok(ScriptProcess { child, pgid })
}

impl ScriptProcess {
    /// Process-group id to signal for cancellation.
    pub fn pgid(&self) -> i32 {
        self.pgid
    }

    /// Stream stdout and stderr into `tee` and wait for completion.
    pub async fn stream_to(mut self, tee: &Tee) -> Result<ScriptStatus, ScriptError> {
        let mut pumps = Vec::new();
        if let Some(stdout) = self.child.stdout.take() {
            pumps.push(tokio::spawn(pump(stdout, tee.clone())));
        }
        if let Some(stderr) = self.child.stderr.take() {
            pumps.push(tokio::spawn(pump(stderr, tee.clone())));
        }

        let status = self.child.wait().await?;
        for pump in pumps {
            let _ = pump.await;
        }

        Ok(classify(status))
    }
}

async fn pump<R: AsyncReadExt + Unpin>(mut reader: R, tee: Tee) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tee.write(&buf[..n]).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(unix)]
fn classify(status: std::process::ExitStatus) -> ScriptStatus {
    use std::os::unix::process::ExitStatusExt;
    if status.success() {
        ScriptStatus::Success
    } else if let Some(code) = status.code() {
        ScriptStatus::Failed(code)
    } else if status.signal().is_some() {
        ScriptStatus::Interrupted
    } else {
        ScriptStatus::Failed(-1)
    }
}

#[cfg(not(unix))]
fn classify(status: std::process::ExitStatus) -> ScriptStatus {
    if status.success() {
        ScriptStatus::Success
    } else {
        ScriptStatus::Failed(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
