// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build amortization across consecutive jobs on one worker.

use crate::prelude::*;
use serde_json::json;

fn job_with_build(h: &Harness, name: &str, nodes: i64, run_script: &str) -> Job {
    let mut job = h.job(name, &[run_script]);
    job.params.insert("nodes".to_string(), json!(nodes));
    job.build = BuildConf {
        script: vec!["echo building".to_string()],
        depend_params: vec!["nodes".to_string()],
    };
    job
}

/// Two jobs with identical build-relevant inputs but different run
/// scripts: the build runs once. A third job with a changed build
/// parameter rebuilds.
#[tokio::test]
async fn identical_build_inputs_skip_the_second_build() {
    let h = Harness::new();
    let first = h.push(job_with_build(&h, "first", 4, "echo run-one"));
    let second = h.push(job_with_build(&h, "second", 4, "echo run-two"));
    let third = h.push(job_with_build(&h, "third", 8, "echo run-three"));

    worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts()).await.expect("worker");

    let first = h.state(first.id);
    let second = h.state(second.id);
    let third = h.state(third.id);
    assert_eq!(first.running_state, RunningState::Terminated);
    assert_eq!(second.running_state, RunningState::Terminated);
    assert_eq!(third.running_state, RunningState::Terminated);

    assert!(first.build_executed, "first job must build");
    assert!(!second.build_executed, "matching inputs must not rebuild");
    assert!(third.build_executed, "changed build param must rebuild");
}

/// A failed build aborts the job and forces the next matching job to
/// build again.
#[tokio::test]
async fn failed_build_is_not_amortized() {
    let h = Harness::new();
    let mut bad = job_with_build(&h, "bad", 4, "echo run");
    bad.build.script = vec!["exit 1".to_string()];
    let bad = h.push(bad);

    let mut good = job_with_build(&h, "good", 4, "echo run");
    good.build.script = vec!["exit 1".to_string()];
    let good = h.push(good);

    worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts()).await.expect("worker");

    assert_eq!(h.state(bad.id).running_state, RunningState::Aborted);
    // identical inputs, but the first build failed, so this one built too
    let good = h.state(good.id);
    assert_eq!(good.running_state, RunningState::Aborted);
    assert!(good.build_executed);
}

/// A run-phase failure aborts the job but keeps the build cached for the
/// next job with matching inputs.
#[tokio::test]
async fn run_failure_keeps_the_build_cache() {
    let h = Harness::new();
    let failing = h.push(job_with_build(&h, "failing-run", 4, "exit 2"));
    let following = h.push(job_with_build(&h, "following", 4, "echo ok"));

    worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts()).await.expect("worker");

    assert_eq!(h.state(failing.id).running_state, RunningState::Aborted);
    let following = h.state(following.id);
    assert_eq!(following.running_state, RunningState::Terminated);
    assert!(!following.build_executed, "build survived the run failure");
}
