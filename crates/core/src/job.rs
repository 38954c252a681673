// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record, per-job persistent state, and the build fingerprint used
//! for build amortization across consecutive jobs.

use crate::context::Context;
use crate::install::InstallState;
use crate::state::RunningState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Script plus the parameter names it depends on.
///
/// Only the named parameters are surfaced to the script as
/// `KOCHI_PARAM_<NAME>`; for the build phase they also feed the build
/// fingerprint, so unrelated parameter changes do not force a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConf {
    pub script: Vec<String>,
    #[serde(default)]
    pub depend_params: Vec<String>,
}

/// Run-phase counterpart of [`BuildConf`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConf {
    pub script: Vec<String>,
    #[serde(default)]
    pub depend_params: Vec<String>,
}

/// What to publish for an artifact declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The job log file.
    Stdout,
    /// The rendered job detail.
    Stats,
    /// A file produced by the job, copied from its working directory.
    File,
}

crate::simple_display! {
    ArtifactKind {
        Stdout => "stdout",
        Stats => "stats",
        File => "file",
    }
}

/// One declared artifact. `dest` may reference job parameters as `$name`;
/// `src` is required for `type = file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub dest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

/// A job as it travels through the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Monotone per-machine id, stamped at enqueue.
    pub id: u64,
    pub name: String,
    pub machine: String,
    pub queue: String,
    pub project: String,
    /// Ordered dependency name → recipe variant.
    pub dependencies: IndexMap<String, String>,
    pub context: Option<Context>,
    pub params: IndexMap<String, Value>,
    pub artifacts: Vec<ArtifactSpec>,
    pub activate_script: Vec<String>,
    pub build: BuildConf,
    pub run: RunConf,
}

impl Job {
    /// Parameters the build phase depends on, in declaration order.
    pub fn build_params(&self) -> IndexMap<String, Value> {
        filter_params(&self.params, &self.build.depend_params)
    }

    /// Parameters the run phase depends on, in declaration order.
    pub fn run_params(&self) -> IndexMap<String, Value> {
        filter_params(&self.params, &self.run.depend_params)
    }
}

fn filter_params(params: &IndexMap<String, Value>, names: &[String]) -> IndexMap<String, Value> {
    params
        .iter()
        .filter(|(name, _)| names.iter().any(|n| n == *name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// The inputs whose change forces a rebuild on a worker.
///
/// Context is compared as a whole, so a changed diff invalidates the build
/// even when parameters are unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFingerprint {
    pub dependency_states: Vec<InstallState>,
    pub context: Option<Context>,
    pub build_params: IndexMap<String, Value>,
}

impl BuildFingerprint {
    pub fn of(job: &Job, dependency_states: &[InstallState]) -> Self {
        Self {
            dependency_states: dependency_states.to_vec(),
            context: job.context.clone(),
            build_params: job.build_params(),
        }
    }
}

/// Per-job persistent state record.
///
/// Written once at enqueue (WAITING), rewritten at start (RUNNING) and at
/// completion (terminal state). CANCELED-while-waiting and KILLED are
/// synthesized by readers; see the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub running_state: RunningState,
    pub name: String,
    pub queue: String,
    pub worker_id: Option<u64>,
    pub context: Option<Context>,
    /// Snapshot of each resolved installer state at enqueue time.
    pub dependency_states: Vec<InstallState>,
    /// Effective environment, persisted at start.
    pub envs: IndexMap<String, String>,
    pub artifacts: Vec<ArtifactSpec>,
    pub activate_script: Vec<String>,
    /// Whether this worker re-ran the build phase for this job.
    pub build_executed: bool,
    pub build_params: IndexMap<String, Value>,
    pub build_script: Vec<String>,
    pub run_params: IndexMap<String, Value>,
    pub run_script: Vec<String>,
    pub init_time: u64,
    pub start_time: Option<u64>,
    pub latest_time: Option<u64>,
}

impl JobState {
    /// Initial record written before the job is appended to the queue.
    pub fn waiting(job: &Job, dependency_states: Vec<InstallState>, now: u64) -> Self {
        Self {
            running_state: RunningState::Waiting,
            name: job.name.clone(),
            queue: job.queue.clone(),
            worker_id: None,
            context: job.context.clone(),
            dependency_states,
            envs: IndexMap::new(),
            artifacts: job.artifacts.clone(),
            activate_script: job.activate_script.clone(),
            build_executed: false,
            build_params: job.build_params(),
            build_script: job.build.script.clone(),
            run_params: job.run_params(),
            run_script: job.run.script.clone(),
            init_time: now,
            start_time: None,
            latest_time: None,
        }
    }

    /// Placeholder for a missing or undecodable state file.
    pub fn invalid() -> Self {
        Self {
            running_state: RunningState::Invalid,
            name: String::new(),
            queue: String::new(),
            worker_id: None,
            context: None,
            dependency_states: Vec::new(),
            envs: IndexMap::new(),
            artifacts: Vec::new(),
            activate_script: Vec::new(),
            build_executed: false,
            build_params: IndexMap::new(),
            build_script: Vec::new(),
            run_params: IndexMap::new(),
            run_script: Vec::new(),
            init_time: 0,
            start_time: None,
            latest_time: None,
        }
    }

    /// Transition WAITING → RUNNING when a worker picks the job up.
    pub fn on_start(
        &mut self,
        worker_id: u64,
        envs: IndexMap<String, String>,
        build_executed: bool,
        now: u64,
    ) {
        self.running_state = RunningState::Running;
        self.worker_id = Some(worker_id);
        self.envs = envs;
        self.build_executed = build_executed;
        self.start_time = Some(now);
        self.latest_time = Some(now);
    }

    /// Transition RUNNING → a terminal state.
    pub fn on_finish(&mut self, outcome: RunningState, now: u64) {
        self.running_state = outcome;
        self.latest_time = Some(now);
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
