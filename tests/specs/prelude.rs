// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the execution-plane scenarios.

pub use indexmap::IndexMap;
pub use kochi_core::{
    BuildConf, Clock, Job, JobState, KochiHome, RunConf, RunningState, SystemClock,
};
pub use kochi_engine::{queue, worker, WorkerOptions};
pub use kochi_storage::{bootstrap, cancel, job_store, worker_store};
pub use std::time::Duration;

pub const MACHINE: &str = "local";
pub const QUEUE: &str = "q";

/// A fresh kochi root on a temp directory with the machine bootstrapped.
pub struct Harness {
    pub home: KochiHome,
    pub clock: SystemClock,
    _tmp: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let home = KochiHome::new(tmp.path());
        bootstrap::ensure_machine(&home, MACHINE).expect("bootstrap");
        Self { home, clock: SystemClock, _tmp: tmp }
    }

    /// A minimal job running `run_script` with no context or dependencies.
    pub fn job(&self, name: &str, run_script: &[&str]) -> Job {
        Job {
            id: 0,
            name: name.to_string(),
            machine: MACHINE.to_string(),
            queue: QUEUE.to_string(),
            project: "proj".to_string(),
            dependencies: IndexMap::new(),
            context: None,
            params: IndexMap::new(),
            artifacts: Vec::new(),
            activate_script: Vec::new(),
            build: BuildConf::default(),
            run: RunConf {
                script: run_script.iter().map(|s| s.to_string()).collect(),
                depend_params: Vec::new(),
            },
        }
    }

    pub fn push(&self, job: Job) -> Job {
        queue::push(&self.home, &self.clock, job).expect("push")
    }

    pub fn state(&self, job_id: u64) -> JobState {
        job_store::get(&self.home, MACHINE, job_id, self.clock.epoch_secs())
    }

    /// Worker options tuned for test latency.
    pub fn fast_opts(&self) -> WorkerOptions {
        WorkerOptions {
            blocking: false,
            heartbeat_interval: Duration::from_millis(100),
            cancel_poll_interval: Duration::from_millis(100),
            idle_sleep: Duration::from_millis(10),
        }
    }
}

/// Poll `check` until it holds or `max` elapses.
pub async fn wait_for(max: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + max;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
