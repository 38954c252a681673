// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat ticker task.
//!
//! Writes the WAITING record synchronously at start, then rewrites the
//! file as RUNNING every interval until closed, when it writes a final
//! TERMINATED record and joins.

use kochi_core::{Clock, HeartbeatRecord, KochiHome};
use kochi_storage::{heartbeat as heartbeat_file, StorageError};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct Heartbeat {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Write the init record and start the background ticker.
    pub fn start<C: Clock + 'static>(
        home: &KochiHome,
        machine: &str,
        worker_id: u64,
        interval: Duration,
        clock: C,
    ) -> Result<Self, StorageError> {
        let path = home.worker_heartbeat(machine, worker_id);
        let record = HeartbeatRecord::init(clock.epoch_secs());
        heartbeat_file::write(&path, &record)?;

        let token = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(path, record, interval, clock, token.clone()));
        Ok(Self { token, handle })
    }

    /// Stop the ticker; the final TERMINATED record is written before the
    /// task exits.
    pub async fn close(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

async fn tick_loop<C: Clock>(
    path: PathBuf,
    mut record: HeartbeatRecord,
    interval: Duration,
    clock: C,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                let terminated = record.terminate(clock.epoch_secs());
                if let Err(e) = heartbeat_file::write(&path, &terminated) {
                    warn!(error = %e, "failed to write final heartbeat");
                }
                return;
            }
            _ = tokio::time::sleep(interval) => {
                record = record.tick(clock.epoch_secs());
                if let Err(e) = heartbeat_file::write(&path, &record) {
                    warn!(error = %e, "failed to write heartbeat");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
