// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log tee: multiplexes output to a log file and an upstream sink.
//!
//! Replaces the `tee` child process of the original design with a native
//! writer. A worker tee echoes to the process stdout; each job tee
//! forwards into the worker tee, so the job log contains exactly the
//! job's output while the worker log carries everything.

use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

struct Inner {
    file: Mutex<tokio::fs::File>,
    upstream: Upstream,
}

enum Upstream {
    Stdout,
    Parent(Tee),
    None,
}

#[derive(Clone)]
pub struct Tee {
    inner: Arc<Inner>,
}

impl Tee {
    /// Create a tee over a fresh log file that echoes to stdout.
    pub async fn to_stdout(path: &Path) -> std::io::Result<Self> {
        Self::new(path, Upstream::Stdout).await
    }

    /// Create a tee over a fresh log file that forwards into `parent`.
    pub async fn nested(path: &Path, parent: &Tee) -> std::io::Result<Self> {
        Self::new(path, Upstream::Parent(parent.clone())).await
    }

    /// Create a tee that only writes the log file.
    pub async fn to_file(path: &Path) -> std::io::Result<Self> {
        Self::new(path, Upstream::None).await
    }

    async fn new(path: &Path, upstream: Upstream) -> std::io::Result<Self> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self { inner: Arc::new(Inner { file: Mutex::new(file), upstream }) })
    }

    /// Write raw bytes to the log file and the upstream sink.
    pub async fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        {
            let mut file = self.inner.file.lock().await;
            file.write_all(bytes).await?;
            file.flush().await?;
        }
        match &self.inner.upstream {
            Upstream::Stdout => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(bytes).await?;
                stdout.flush().await?;
            }
            // box the recursive call so the future stays sized
            Upstream::Parent(parent) => Box::pin(parent.write(bytes)).await?,
            Upstream::None => {}
        }
        Ok(())
    }

    /// Write one line of text.
    pub async fn line(&self, text: &str) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(b'\n');
        self.write(&bytes).await
    }
}

#[cfg(test)]
#[path = "tee_tests.rs"]
mod tests;
