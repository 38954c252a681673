// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact publishing onto a versioned git log.
//!
//! The user's repository carries an orphan `kochi_artifacts` branch with
//! one child branch per machine. Workers publish declared outputs by
//! committing into a lazily-cloned checkout of the machine branch and
//! pushing under optimistic-concurrency retry: each attempt rebases onto
//! the remote with `-X theirs`, so concurrent writers converge.

use crate::stats;
use kochi_adapters::git::{self, GitError};
use kochi_core::{params, ArtifactKind, Clock, Job, KochiHome, ParamError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const MASTER_BRANCH: &str = "kochi_artifacts";
pub const COMMIT_NAME: &str = "kochi";
pub const COMMIT_EMAIL: &str = "<>";
const MAX_PUSH_RETRY: u32 = 20;
const PUSH_RETRY_DELAY: Duration = Duration::from_secs(1);

pub fn machine_branch(machine: &str) -> String {
    format!("{MASTER_BRANCH}_{machine}")
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("no git worktree for branch '{MASTER_BRANCH}'; run artifact init first")]
    NotInitialized,

    #[error("a git worktree for branch '{MASTER_BRANCH}' already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("could not push artifacts after {0} retries")]
    PushContention(u32),

    #[error("artifact declaration of type 'file' is missing 'src'")]
    MissingSrc,

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io { path: path.to_path_buf(), source }
}

/// Locate the local worktree checked out to the artifact master branch.
async fn find_worktree(repo_dir: &Path) -> Result<Option<PathBuf>, ArtifactError> {
    let worktrees = git::worktree_list(repo_dir).await?;
    Ok(worktrees.into_iter().find(|(_, branch)| branch == MASTER_BRANCH).map(|(path, _)| path))
}

/// One-time local setup: create the orphan artifact branch with an empty
/// initial commit and a dedicated worktree for it.
pub async fn init(repo_dir: &Path, new_worktree_path: &Path) -> Result<(), ArtifactError> {
    if let Some(existing) = find_worktree(repo_dir).await? {
        return Err(ArtifactError::AlreadyInitialized(existing));
    }
    git::worktree_add_detach(repo_dir, new_worktree_path).await?;
    git::checkout_orphan(new_worktree_path, MASTER_BRANCH).await?;
    git::reset_hard(new_worktree_path).await?;
    git::commit_allow_empty(
        new_worktree_path,
        COMMIT_NAME,
        COMMIT_EMAIL,
        "[kochi] create an artifact branch",
    )
    .await?;
    Ok(())
}

/// Lazily create the per-machine branch off the artifact master branch
/// and push it to `destination`. Called locally before a machine is
/// first used.
pub async fn ensure_machine(
    repo_dir: &Path,
    machine: &str,
    destination: &str,
) -> Result<(), ArtifactError> {
    let worktree = find_worktree(repo_dir).await?.ok_or(ArtifactError::NotInitialized)?;
    let branch = machine_branch(machine);

    let result = async {
        if git::branch_exists(&worktree, &branch).await {
            Ok(())
        } else {
            git::checkout_reset_branch(&worktree, &branch).await?;
            git::push_upstream(&worktree, destination, &branch).await?;
            Ok(())
        }
    }
    .await;

    // always land back on the master branch
    git::checkout_branch(&worktree, MASTER_BRANCH).await?;
    result
}

/// Pull a machine branch and merge it into the artifact master branch so
/// published outputs become visible locally.
pub async fn sync(repo_dir: &Path, machine: &str) -> Result<(), ArtifactError> {
    let worktree = find_worktree(repo_dir).await?.ok_or(ArtifactError::NotInitialized)?;
    let branch = machine_branch(machine);

    let result = async {
        git::checkout_branch(&worktree, &branch).await?;
        git::pull(&worktree).await
    }
    .await;
    git::checkout_branch(&worktree, MASTER_BRANCH).await?;
    result?;
    git::merge_no_edit(&worktree, &branch).await?;
    Ok(())
}

/// Worker-local checkout of the artifact repo for one project.
fn worker_checkout(home: &KochiHome, machine: &str, worker_id: u64, project: &str) -> PathBuf {
    home.worker_workspace(machine, worker_id).join("artifacts").join(project)
}

/// Publish a finished job's declared outputs.
///
/// Ensures the worker-local clone of the machine branch exists, populates
/// each declared artifact under the machine's subdirectory (destinations
/// resolve `$param` references against the job's parameters), commits as
/// `kochi <>`, and pushes with up to 20 rebase-retry rounds.
pub async fn save<C: Clock>(
    home: &KochiHome,
    machine: &str,
    worker_id: u64,
    job: &Job,
    job_cwd: &Path,
    clock: &C,
) -> Result<(), ArtifactError> {
    let checkout = worker_checkout(home, machine, worker_id, &job.project);
    if !checkout.is_dir() {
        let remote = job
            .context
            .as_ref()
            .and_then(|ctx| ctx.git_remote.clone())
            .unwrap_or_else(|| home.project_artifact_git(&job.project).display().to_string());
        let base = home.worker_workspace(machine, worker_id);
        std::fs::create_dir_all(checkout.parent().unwrap_or(&base)).map_err(io_at(&checkout))?;
        git::clone_branch_recursive(&base, &remote, &machine_branch(machine), &checkout).await?;
    }

    for spec in &job.artifacts {
        let dest_rel = params::expand(&spec.dest, &job.params)?;
        let dest = checkout.join(machine).join(&dest_rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(io_at(parent))?;
        }
        match spec.kind {
            ArtifactKind::Stdout => {
                let log = home.job_log(machine, job.id);
                std::fs::copy(&log, &dest).map_err(io_at(&log))?;
            }
            ArtifactKind::Stats => {
                let detail = stats::render_job_detail(home, machine, job.id, clock.epoch_secs());
                std::fs::write(&dest, detail).map_err(io_at(&dest))?;
            }
            ArtifactKind::File => {
                let src = spec.src.as_ref().ok_or(ArtifactError::MissingSrc)?;
                let src = job_cwd.join(src);
                std::fs::copy(&src, &dest).map_err(io_at(&src))?;
            }
        }
    }

    push_loop(&checkout, machine).await
}

/// Commit staged artifacts and push under contention.
async fn push_loop(checkout: &Path, machine: &str) -> Result<(), ArtifactError> {
    let branch = machine_branch(machine);
    let message = format!("[kochi] add artifact on {machine}");
    git::add_all(checkout).await?;
    git::commit_as(checkout, COMMIT_NAME, COMMIT_EMAIL, &message).await?;

    for retry in 0..=MAX_PUSH_RETRY {
        match try_push(checkout, &branch).await {
            Ok(()) => {
                info!(branch, retry, "artifacts pushed");
                return Ok(());
            }
            Err(e) => {
                warn!(branch, retry, error = %e, "artifact push attempt failed");
                git::reset(checkout).await?;
                if retry == MAX_PUSH_RETRY {
                    return Err(ArtifactError::PushContention(MAX_PUSH_RETRY));
                }
                tokio::time::sleep(PUSH_RETRY_DELAY).await;
            }
        }
    }
    Err(ArtifactError::PushContention(MAX_PUSH_RETRY))
}

async fn try_push(checkout: &Path, branch: &str) -> Result<(), GitError> {
    git::pull_rebase_theirs(checkout, "origin", branch).await?;
    git::push(checkout, "origin", branch).await
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
