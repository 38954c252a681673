// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle and main loop.
//!
//! A worker owns a monotonic id, a heartbeat, a scratch workspace, and
//! one queue. It amortizes the build phase across consecutive jobs whose
//! build-relevant inputs (dependency-state snapshots, context, and
//! build parameters) match by value.

use crate::heartbeat::Heartbeat;
use crate::queue::{self, QueueError};
use crate::runner::{self, RunnerError};
use kochi_adapters::{sshd, Tee};
use kochi_core::{BuildFingerprint, Clock, KochiHome, RunningState};
use kochi_storage::{bootstrap, cancel, counter, job_store, worker_store, StorageError};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("worker io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Keep polling when the queue is empty instead of returning.
    pub blocking: bool,
    pub heartbeat_interval: Duration,
    pub cancel_poll_interval: Duration,
    pub idle_sleep: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            blocking: false,
            heartbeat_interval: Duration::from_secs(kochi_core::HEARTBEAT_INTERVAL_SECS),
            cancel_poll_interval: Duration::from_secs(crate::canceler::CANCEL_POLL_SECS),
            idle_sleep: Duration::from_millis(100),
        }
    }
}

/// Run a worker until its queue drains (or forever with `blocking`).
/// Returns the worker's id.
pub async fn start<C: Clock + 'static>(
    home: &KochiHome,
    clock: &C,
    machine: &str,
    queue: &str,
    opts: WorkerOptions,
) -> Result<u64, WorkerError> {
    bootstrap::ensure_machine(home, machine)?;
    let worker_id = counter::fetch_and_add(&home.worker_counter(machine), 1)?;
    worker_store::init(home, machine, worker_id, queue, clock.epoch_secs())?;

    // fresh scratch workspace per worker lifetime
    let workspace = home.worker_workspace(machine, worker_id);
    if workspace.exists() {
        std::fs::remove_dir_all(&workspace)?;
    }
    std::fs::create_dir_all(&workspace)?;

    let heartbeat =
        Heartbeat::start(home, machine, worker_id, opts.heartbeat_interval, clock.clone())?;
    let inspection = sshd::try_start(home, machine, worker_id);

    let tee = Tee::to_stdout(&home.worker_log(machine, worker_id)).await?;
    let ruler = "=".repeat(80);
    tee.line(&format!(
        "Kochi worker {worker_id} started on machine {machine} (queue: {queue})."
    ))
    .await?;
    tee.line(&ruler).await?;
    info!(worker_id, machine, queue, "worker started");

    let result = main_loop(home, clock, machine, queue, worker_id, &workspace, &tee, &opts).await;
    if let Err(e) = &result {
        let _ = tee
            .line(&format!("Kochi worker {worker_id} terminating on error: {e}"))
            .await;
    }
    let _ = tee.line(&ruler).await;

    heartbeat.close().await;
    worker_store::finish(home, machine, worker_id, clock.epoch_secs())?;
    if let Some(inspection) = inspection {
        inspection.stop().await;
    }
    info!(worker_id, machine, "worker terminated");
    result.map(|_| worker_id)
}

#[allow(clippy::too_many_arguments)]
async fn main_loop<C: Clock>(
    home: &KochiHome,
    clock: &C,
    machine: &str,
    queue_name: &str,
    worker_id: u64,
    workspace: &Path,
    tee: &Tee,
    opts: &WorkerOptions,
) -> Result<(), WorkerError> {
    let mut last_build: Option<BuildFingerprint> = None;
    loop {
        match queue::pop(home, machine, queue_name)? {
            Some(job) => {
                if cancel::is_requested(home, machine, job.id) {
                    job_store::mark_canceled(home, machine, job.id, clock.epoch_secs())?;
                    tee.line(&format!(
                        "Kochi job {} (ID={}) was canceled while waiting; skipping.",
                        job.name, job.id
                    ))
                    .await?;
                    continue;
                }

                let state = job_store::get(home, machine, job.id, clock.epoch_secs());
                let fingerprint = BuildFingerprint {
                    dependency_states: state.dependency_states,
                    context: job.context.clone(),
                    build_params: job.build_params(),
                };
                let exec_build = last_build.as_ref() != Some(&fingerprint);

                let outcome = runner::run(
                    home,
                    clock,
                    &job,
                    worker_id,
                    machine,
                    queue_name,
                    exec_build,
                    workspace,
                    tee,
                    opts.cancel_poll_interval,
                )
                .await?;
                if outcome.build_success {
                    last_build = Some(fingerprint);
                }
            }
            None if opts.blocking => tokio::time::sleep(opts.idle_sleep).await,
            None => return Ok(()),
        }
    }
}

/// Tail the listed workers' logs to stdout until every one of them reads
/// TERMINATED or INVALID.
pub async fn watch<C: Clock>(
    home: &KochiHome,
    clock: &C,
    machine: &str,
    worker_ids: &[u64],
) -> Result<(), WorkerError> {
    let mut offsets: HashMap<u64, u64> = HashMap::new();
    let mut stdout = tokio::io::stdout();
    loop {
        drain_logs(home, machine, worker_ids, &mut offsets, &mut stdout).await?;

        let all_done = worker_ids.iter().all(|id| {
            let state = worker_store::get(home, machine, *id, clock.epoch_secs());
            matches!(state.running_state, RunningState::Terminated | RunningState::Invalid)
        });
        if all_done {
            drain_logs(home, machine, worker_ids, &mut offsets, &mut stdout).await?;
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn drain_logs(
    home: &KochiHome,
    machine: &str,
    worker_ids: &[u64],
    offsets: &mut HashMap<u64, u64>,
    stdout: &mut tokio::io::Stdout,
) -> Result<(), WorkerError> {
    for id in worker_ids {
        let path = home.worker_log(machine, *id);
        let Ok(mut file) = std::fs::File::open(&path) else { continue };
        let offset = offsets.entry(*id).or_insert(0);
        file.seek(SeekFrom::Start(*offset))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        if !content.is_empty() {
            *offset += content.len() as u64;
            stdout.write_all(&content).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
