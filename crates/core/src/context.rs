// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured git working state attached to jobs and installs.

use serde::{Deserialize, Serialize};

/// A replayable snapshot of a git working tree.
///
/// `reference` is a commit hash or branch name; `diff` is a binary patch
/// against that reference covering both staged and unstaged changes
/// (untracked files are captured via intent-to-add). When `git_remote` is
/// absent, replay clones from the machine-local bare mirror of `project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub project: String,
    pub git_remote: Option<String>,
    pub reference: String,
    pub diff: Option<String>,
}

impl Context {
    pub fn new(project: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            git_remote: None,
            reference: reference.into(),
            diff: None,
        }
    }
}
