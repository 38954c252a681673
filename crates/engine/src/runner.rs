// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job runner: build-then-run with dependency-aware environments.
//!
//! User-script failures never propagate; they are recorded in the job
//! state and log, and the worker keeps serving its queue. Errors that
//! reach the caller are infrastructure failures (state files, log I/O)
//! that terminate the worker.

use crate::canceler::CancelWatcher;
use crate::{artifact, envs, installer};
use kochi_adapters::script::{self, ScriptStatus};
use kochi_adapters::{context, ScriptError, Tee};
use kochi_core::{Clock, Job, KochiHome, RunningState};
use kochi_storage::{cancel, job_store, StorageError};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("job log io error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a job run ended, and whether the build phase is now valid for
/// amortization across subsequent jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub final_state: RunningState,
    pub build_success: bool,
}

/// Run one popped job to completion.
#[allow(clippy::too_many_arguments)]
pub async fn run<C: Clock>(
    home: &KochiHome,
    clock: &C,
    job: &Job,
    worker_id: u64,
    machine: &str,
    queue: &str,
    exec_build: bool,
    workspace: &Path,
    worker_tee: &Tee,
    cancel_poll: Duration,
) -> Result<RunOutcome, RunnerError> {
    let ruler = "-".repeat(80);
    worker_tee.line(&format!("Kochi job {} (ID={}) started.", job.name, job.id)).await?;
    worker_tee.line(&ruler).await?;

    let dep_envs = installer::deps_env(home, &job.project, machine, &job.dependencies);

    let mut base_env = envs::job_base_env(machine, worker_id, queue, job);
    base_env.extend(dep_envs);
    let mut build_env = base_env.clone();
    build_env.extend(envs::param_env(&job.build_params()));
    let mut run_env = base_env.clone();
    run_env.extend(envs::param_env(&job.run_params()));

    let tee = Tee::nested(&home.job_log(machine, job.id), worker_tee).await?;

    job_store::on_start(
        home,
        machine,
        job.id,
        worker_id,
        base_env,
        exec_build,
        clock.epoch_secs(),
    )?;

    let job_cwd = match &job.context {
        Some(ctx) => match context::replay(home, ctx, workspace).await {
            Ok(dir) => dir,
            Err(e) => {
                tee.line(&format!(
                    "Kochi job {} (ID={}) failed to replay context: {e}",
                    job.name, job.id
                ))
                .await?;
                return finish(home, clock, job, machine, RunningState::Aborted, false, worker_tee, &ruler)
                    .await;
            }
        },
        None => workspace.to_path_buf(),
    };

    if exec_build {
        let status = run_phase(
            home,
            machine,
            job.id,
            &job.activate_script,
            &job.build.script,
            &job_cwd,
            &build_env,
            &tee,
            cancel_poll,
        )
        .await?;
        match status {
            ScriptStatus::Success => {}
            ScriptStatus::Failed(code) => {
                tee.line(&format!(
                    "Kochi job {} (ID={}) build failed with status {code}.",
                    job.name, job.id
                ))
                .await?;
                return finish(home, clock, job, machine, RunningState::Aborted, false, worker_tee, &ruler)
                    .await;
            }
            ScriptStatus::Interrupted => {
                let state = interrupted_state(home, machine, job.id);
                tee.line(&format!(
                    "Kochi job {} (ID={}) build interrupted.",
                    job.name, job.id
                ))
                .await?;
                return finish(home, clock, job, machine, state, false, worker_tee, &ruler).await;
            }
        }
    }

    let status = run_phase(
        home,
        machine,
        job.id,
        &job.activate_script,
        &job.run.script,
        &job_cwd,
        &run_env,
        &tee,
        cancel_poll,
    )
    .await?;

    let final_state = match status {
        ScriptStatus::Success => {
            if !job.artifacts.is_empty() && job.context.is_some() {
                if let Err(e) = artifact::save(home, machine, worker_id, job, &job_cwd, clock).await {
                    // the job's outcome stands; only the save failed
                    tee.line(&format!(
                        "Kochi artifacts for job {} (ID={}) could not be saved: {e}",
                        job.name, job.id
                    ))
                    .await?;
                }
            }
            RunningState::Terminated
        }
        ScriptStatus::Failed(code) => {
            tee.line(&format!(
                "Kochi job {} (ID={}) failed with status {code}.",
                job.name, job.id
            ))
            .await?;
            RunningState::Aborted
        }
        ScriptStatus::Interrupted => {
            let state = interrupted_state(home, machine, job.id);
            tee.line(&format!("Kochi job {} (ID={}) interrupted.", job.name, job.id)).await?;
            state
        }
    };

    finish(home, clock, job, machine, final_state, true, worker_tee, &ruler).await
}

/// Cancel flag decides between CANCELED and ABORTED for an interruption.
fn interrupted_state(home: &KochiHome, machine: &str, job_id: u64) -> RunningState {
    if cancel::is_requested(home, machine, job_id) {
        RunningState::Canceled
    } else {
        RunningState::Aborted
    }
}

#[allow(clippy::too_many_arguments)]
async fn finish<C: Clock>(
    home: &KochiHome,
    clock: &C,
    job: &Job,
    machine: &str,
    final_state: RunningState,
    build_success: bool,
    worker_tee: &Tee,
    ruler: &str,
) -> Result<RunOutcome, RunnerError> {
    job_store::on_finish(home, machine, job.id, final_state, clock.epoch_secs())?;
    worker_tee.line(ruler).await?;
    Ok(RunOutcome { final_state, build_success })
}

/// One phase: activate + phase script as a single shell pipeline under a
/// cancel watcher scoped to the script's process group.
#[allow(clippy::too_many_arguments)]
async fn run_phase(
    home: &KochiHome,
    machine: &str,
    job_id: u64,
    activate: &[String],
    script_lines: &[String],
    cwd: &Path,
    env: &indexmap::IndexMap<String, String>,
    tee: &Tee,
    cancel_poll: Duration,
) -> Result<ScriptStatus, RunnerError> {
    let mut lines = activate.to_vec();
    lines.extend_from_slice(script_lines);
    let process = script::spawn(&lines, cwd, env)?;
    let watcher = CancelWatcher::start(home, machine, job_id, process.pgid(), cancel_poll);
    let status = process.stream_to(tee).await;
    watcher.stop().await;
    Ok(status?)
}
