// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context capture and replay.
//!
//! Capture snapshots the caller's working tree as a commit reference plus
//! a binary diff (untracked files included via intent-to-add). Replay
//! rebuilds that exact tree inside a per-project clone next to the
//! caller's chosen base directory.

use crate::git::{self, GitError};
use kochi_core::{Context, KochiHome};
use std::path::{Path, PathBuf};

/// Capture the working tree at `dir` as a replayable context.
///
/// The project name is the basename of the top-level git directory. The
/// diff is omitted when the tree is clean.
pub async fn capture(dir: &Path, git_remote: Option<String>) -> Result<Context, GitError> {
    let toplevel = git::toplevel(dir).await?;
    let project = toplevel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let reference = git::rev_parse(dir, "HEAD").await?;
    git::add_intent_to_add(dir).await?;
    let diff = git::diff_binary(dir, &reference).await?;
    Ok(Context {
        project,
        git_remote,
        reference,
        diff: if diff.is_empty() { None } else { Some(diff) },
    })
}

/// Capture pinned to a branch or commit instead of the working tree.
pub async fn capture_reference(
    dir: &Path,
    reference: &str,
    git_remote: Option<String>,
) -> Result<Context, GitError> {
    let toplevel = git::toplevel(dir).await?;
    let project = toplevel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Context {
        project,
        git_remote,
        reference: reference.to_string(),
        diff: None,
    })
}

/// Materialize `ctx` under `base_dir` and return the project directory.
///
/// Clones on first use, from the recorded remote or from the
/// machine-local bare mirror when the context has none. The checkout is
/// forced to the recorded reference, submodules are synced, untracked
/// files are cleaned, and the diff (if any) is applied; a diff that fails
/// to apply is an error, never a partial tree.
pub async fn replay(
    home: &KochiHome,
    ctx: &Context,
    base_dir: &Path,
) -> Result<PathBuf, GitError> {
    let project_dir = base_dir.join(&ctx.project);
    if !project_dir.is_dir() {
        let remote = match &ctx.git_remote {
            Some(remote) => remote.clone(),
            None => home.project_git(&ctx.project).display().to_string(),
        };
        git::clone_quiet(base_dir, &remote, &project_dir).await?;
    }
    git::fetch(&project_dir).await?;
    git::checkout_force(&project_dir, &ctx.reference).await?;
    git::submodule_update(&project_dir).await?;
    git::clean(&project_dir).await?;
    if let Some(diff) = &ctx.diff {
        if !diff.is_empty() {
            git::apply_diff(&project_dir, diff).await?;
        }
    }
    Ok(project_dir)
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
