// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout under the kochi root directory.
//!
//! All state for one machine lives in one filesystem tree, rooted at
//! `$KOCHI_ROOT` (default `~/.kochi`). `KochiHome` is constructed once at
//! bootstrap and passed to every collaborator.

use std::path::{Path, PathBuf};

pub const ENV_ROOT: &str = "KOCHI_ROOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KochiHome {
    root: PathBuf,
}

impl KochiHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `$KOCHI_ROOT`, falling back to `~/.kochi`.
    pub fn from_env() -> Self {
        match std::env::var_os(ENV_ROOT) {
            Some(root) => Self::new(root),
            None => {
                let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                Self::new(home.join(".kochi"))
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Queues
    // -----------------------------------------------------------------------

    pub fn queue_dir(&self, machine: &str) -> PathBuf {
        self.root.join("queues").join(machine)
    }

    pub fn queue_file(&self, machine: &str, queue: &str) -> PathBuf {
        self.queue_dir(machine).join(format!("{queue}.lock"))
    }

    // Workers
    // -----------------------------------------------------------------------

    pub fn worker_dir(&self, machine: &str) -> PathBuf {
        self.root.join("workers").join(machine)
    }

    pub fn worker_counter(&self, machine: &str) -> PathBuf {
        self.worker_dir(machine).join("counter.lock")
    }

    pub fn worker_min_active(&self, machine: &str) -> PathBuf {
        self.worker_dir(machine).join("min_active.lock")
    }

    pub fn worker_log(&self, machine: &str, id: u64) -> PathBuf {
        self.worker_dir(machine).join(format!("log_{id}.txt"))
    }

    pub fn worker_state(&self, machine: &str, id: u64) -> PathBuf {
        self.worker_dir(machine).join(format!("state_{id}.txt"))
    }

    pub fn worker_heartbeat(&self, machine: &str, id: u64) -> PathBuf {
        self.worker_dir(machine).join(format!("heartbeat_{id}.txt"))
    }

    pub fn worker_workspace(&self, machine: &str, id: u64) -> PathBuf {
        self.worker_dir(machine).join(format!("workspace_{id}"))
    }

    // Jobs
    // -----------------------------------------------------------------------

    pub fn job_dir(&self, machine: &str) -> PathBuf {
        self.root.join("jobs").join(machine)
    }

    pub fn job_counter(&self, machine: &str) -> PathBuf {
        self.job_dir(machine).join("counter.lock")
    }

    pub fn job_min_active(&self, machine: &str) -> PathBuf {
        self.job_dir(machine).join("min_active.lock")
    }

    pub fn job_log(&self, machine: &str, id: u64) -> PathBuf {
        self.job_dir(machine).join(format!("log_{id}.txt"))
    }

    pub fn job_state(&self, machine: &str, id: u64) -> PathBuf {
        self.job_dir(machine).join(format!("state_{id}.txt"))
    }

    pub fn job_cancelreq(&self, machine: &str, id: u64) -> PathBuf {
        self.job_dir(machine).join(format!("cancelreq_{id}.txt"))
    }

    // Projects
    // -----------------------------------------------------------------------

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.projects_dir().join(project)
    }

    /// Machine-local bare mirror cloned from when a context has no remote.
    pub fn project_git(&self, project: &str) -> PathBuf {
        self.project_dir(project).join("git")
    }

    /// Machine-local bare mirror of the artifact branches.
    pub fn project_artifact_git(&self, project: &str) -> PathBuf {
        self.project_dir(project).join("artifact_git")
    }

    /// Destination prefix a recipe installs into.
    pub fn install_prefix(&self, project: &str, machine: &str, dep: &str, recipe: &str) -> PathBuf {
        self.project_dir(project).join("install").join(machine).join(dep).join(recipe)
    }

    /// Scratch tree the recipe is built in.
    pub fn install_src(&self, project: &str, machine: &str, dep: &str, recipe: &str) -> PathBuf {
        self.project_dir(project).join("install_src").join(machine).join(dep).join(recipe)
    }

    pub fn install_log(&self, project: &str, machine: &str, dep: &str, recipe: &str) -> PathBuf {
        self.install_prefix(project, machine, dep, recipe).join(".kochi_log.txt")
    }

    pub fn install_state(&self, project: &str, machine: &str, dep: &str, recipe: &str) -> PathBuf {
        self.install_prefix(project, machine, dep, recipe).join(".kochi_state.txt")
    }

    // Inspection sshd
    // -----------------------------------------------------------------------

    pub fn sshd_dir(&self) -> PathBuf {
        self.root.join("sshd")
    }

    pub fn sshd_etc_dir(&self) -> PathBuf {
        self.sshd_dir().join("etc")
    }

    pub fn sshd_config(&self) -> PathBuf {
        self.sshd_etc_dir().join("sshd_config")
    }

    pub fn sshd_var_run(&self, machine: &str, worker_id: u64) -> PathBuf {
        self.worker_workspace(machine, worker_id).join("var").join("run")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
