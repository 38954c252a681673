// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancel watcher task.
//!
//! Polls the job's cancel flag while a script runs and interrupts the
//! script's process group when the flag appears. The worker itself is in
//! a different group and never receives the signal.

use kochi_core::KochiHome;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default seconds between flag polls.
pub const CANCEL_POLL_SECS: u64 = 5;

pub struct CancelWatcher {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl CancelWatcher {
    /// Watch the cancel flag for `job_id`, signaling `pgid` when present.
    pub fn start(
        home: &KochiHome,
        machine: &str,
        job_id: u64,
        pgid: i32,
        interval: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(watch_loop(
            home.clone(),
            machine.to_string(),
            job_id,
            pgid,
            interval,
            token.clone(),
        ));
        Self { token, handle }
    }

    /// Stop polling and join the task.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

async fn watch_loop(
    home: KochiHome,
    machine: String,
    job_id: u64,
    pgid: i32,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(interval) => {
                if kochi_storage::cancel::is_requested(&home, &machine, job_id) {
                    info!(job_id, pgid, "cancel requested, interrupting process group");
                    interrupt_group(pgid);
                }
            }
        }
    }
}

#[cfg(unix)]
fn interrupt_group(pgid: i32) {
    if pgid <= 0 {
        return;
    }
    let _ = nix::sys::signal::killpg(nix::unistd::Pid::from_raw(pgid), nix::sys::signal::Signal::SIGINT);
}

#[cfg(not(unix))]
fn interrupt_group(_pgid: i32) {}

#[cfg(test)]
#[path = "canceler_tests.rs"]
mod tests;
