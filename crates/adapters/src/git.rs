// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed wrappers around the git binary.
//!
//! Every wrapper runs with `GIT_DIR`/`GIT_WORK_TREE` scrubbed so a caller
//! inside some other repository cannot leak its environment into kochi's
//! clones.

use crate::subprocess::{run_with_timeout, SubprocessError, GIT_TIMEOUT};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    #[error("git {op} failed: {stderr}")]
    Command { op: String, stderr: String },

    #[error("git {op} io error: {source}")]
    Io {
        op: String,
        #[source]
        source: std::io::Error,
    },
}

fn command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");
    cmd
}

async fn git(dir: &Path, args: &[&str]) -> Result<Output, GitError> {
    let op = args.first().copied().unwrap_or("?").to_string();
    let output = run_with_timeout(command(dir, args), GIT_TIMEOUT, &format!("git {op}")).await?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(GitError::Command {
            op,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

async fn git_stdout(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = git(dir, args).await?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether `dir` succeeds at an operation; used for try-then-fallback
/// flows like branch bootstrap.
async fn git_succeeds(dir: &Path, args: &[&str]) -> bool {
    git(dir, args).await.is_ok()
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

pub async fn rev_parse(dir: &Path, reference: &str) -> Result<String, GitError> {
    git_stdout(dir, &["rev-parse", reference]).await
}

/// Absolute path of the working-tree top level.
pub async fn toplevel(dir: &Path) -> Result<PathBuf, GitError> {
    Ok(PathBuf::from(git_stdout(dir, &["rev-parse", "--show-toplevel"]).await?))
}

/// `git worktree list` as (path, branch) pairs; detached worktrees carry
/// the literal `(detached HEAD)` marker in the branch column.
pub async fn worktree_list(dir: &Path) -> Result<Vec<(PathBuf, String)>, GitError> {
    let text = git_stdout(dir, &["worktree", "list", "--porcelain"]).await?;
    let mut out = Vec::new();
    let mut path: Option<PathBuf> = None;
    for line in text.lines() {
        if let Some(p) = line.strip_prefix("worktree ") {
            path = Some(PathBuf::from(p));
        } else if let Some(branch) = line.strip_prefix("branch ") {
            if let Some(p) = path.take() {
                let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
                out.push((p, branch.to_string()));
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Stage untracked files as intents-to-add so they show up in the diff.
pub async fn add_intent_to_add(dir: &Path) -> Result<(), GitError> {
    git(dir, &["add", "-N", "."]).await.map(|_| ())
}

/// Binary diff of the working tree against `reference`.
pub async fn diff_binary(dir: &Path, reference: &str) -> Result<String, GitError> {
    let output = git(dir, &["diff", "--binary", reference]).await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

pub async fn clone_quiet(base: &Path, remote: &str, dest: &Path) -> Result<(), GitError> {
    let dest = dest.display().to_string();
    git(base, &["clone", "-q", remote, &dest]).await.map(|_| ())
}

pub async fn clone_branch_recursive(
    base: &Path,
    remote: &str,
    branch: &str,
    dest: &Path,
) -> Result<(), GitError> {
    let dest = dest.display().to_string();
    git(base, &["clone", "--recursive", "-q", "-b", branch, remote, &dest])
        .await
        .map(|_| ())
}

pub async fn fetch(dir: &Path) -> Result<(), GitError> {
    git(dir, &["fetch", "-q"]).await.map(|_| ())
}

pub async fn checkout_force(dir: &Path, reference: &str) -> Result<(), GitError> {
    git(dir, &["checkout", "-f", "-q", reference]).await.map(|_| ())
}

pub async fn submodule_update(dir: &Path) -> Result<(), GitError> {
    git(dir, &["submodule", "update", "--init", "--recursive", "-q"]).await.map(|_| ())
}

pub async fn clean(dir: &Path) -> Result<(), GitError> {
    git(dir, &["clean", "-f", "-d", "-q"]).await.map(|_| ())
}

/// Apply a binary diff from memory via stdin.
pub async fn apply_diff(dir: &Path, diff: &str) -> Result<(), GitError> {
    let op = "apply".to_string();
    let mut cmd = command(dir, &["apply", "--whitespace=nowarn", "-"]);
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .map_err(|source| GitError::Io { op: op.clone(), source })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(diff.as_bytes())
            .await
            .map_err(|source| GitError::Io { op: op.clone(), source })?;
        // close stdin so git sees EOF
        drop(stdin);
    }
    let output = child
        .wait_with_output()
        .await
        .map_err(|source| GitError::Io { op: op.clone(), source })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(GitError::Command {
            op,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mirrors and branches
// ---------------------------------------------------------------------------

pub async fn init_bare(path: &Path) -> Result<(), GitError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let dest = path.display().to_string();
    git(parent, &["init", "-q", "--bare", &dest]).await.map(|_| ())
}

pub async fn push_all(dir: &Path, remote: &str) -> Result<(), GitError> {
    git(dir, &["push", "-q", remote, "--all"]).await.map(|_| ())
}

pub async fn checkout_branch(dir: &Path, branch: &str) -> Result<(), GitError> {
    git(dir, &["checkout", "-q", branch]).await.map(|_| ())
}

/// Checkout `branch`, creating or resetting it to the current HEAD.
pub async fn checkout_reset_branch(dir: &Path, branch: &str) -> Result<(), GitError> {
    git(dir, &["checkout", "-q", "-B", branch]).await.map(|_| ())
}

pub async fn checkout_orphan(dir: &Path, branch: &str) -> Result<(), GitError> {
    git(dir, &["checkout", "--orphan", branch]).await.map(|_| ())
}

pub async fn branch_exists(dir: &Path, branch: &str) -> bool {
    git_succeeds(dir, &["rev-parse", "--verify", "-q", &format!("refs/heads/{branch}")]).await
}

pub async fn reset_hard(dir: &Path) -> Result<(), GitError> {
    git(dir, &["reset", "--hard", "-q"]).await.map(|_| ())
}

pub async fn worktree_add_detach(dir: &Path, path: &Path) -> Result<(), GitError> {
    let dest = path.display().to_string();
    git(dir, &["worktree", "add", "--detach", &dest]).await.map(|_| ())
}

// ---------------------------------------------------------------------------
// Artifact publishing
// ---------------------------------------------------------------------------

pub async fn add_all(dir: &Path) -> Result<(), GitError> {
    git(dir, &["add", "--all"]).await.map(|_| ())
}

/// Commit with a fixed identity; used for artifact commits so histories
/// from different workers merge cleanly.
pub async fn commit_as(
    dir: &Path,
    name: &str,
    email: &str,
    message: &str,
) -> Result<(), GitError> {
    git(
        dir,
        &[
            "-c",
            &format!("user.name={name}"),
            "-c",
            &format!("user.email={email}"),
            "commit",
            "-q",
            "-m",
            message,
        ],
    )
    .await
    .map(|_| ())
}

pub async fn commit_allow_empty(dir: &Path, name: &str, email: &str, message: &str) -> Result<(), GitError> {
    git(
        dir,
        &[
            "-c",
            &format!("user.name={name}"),
            "-c",
            &format!("user.email={email}"),
            "commit",
            "--allow-empty",
            "-q",
            "-m",
            message,
        ],
    )
    .await
    .map(|_| ())
}

pub async fn pull_rebase_theirs(dir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
    git(dir, &["pull", "--rebase", "-s", "recursive", "-X", "theirs", "-q", remote, branch])
        .await
        .map(|_| ())
}

pub async fn push(dir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
    git(dir, &["push", "-q", remote, branch]).await.map(|_| ())
}

pub async fn push_upstream(dir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
    git(dir, &["push", "-u", "-q", remote, branch]).await.map(|_| ())
}

pub async fn reset(dir: &Path) -> Result<(), GitError> {
    git(dir, &["reset", "-q"]).await.map(|_| ())
}

pub async fn pull(dir: &Path) -> Result<(), GitError> {
    git(dir, &["pull", "-q"]).await.map(|_| ())
}

pub async fn merge_no_edit(dir: &Path, branch: &str) -> Result<(), GitError> {
    git(dir, &["merge", "-q", "--no-edit", branch]).await.map(|_| ())
}
