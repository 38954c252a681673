// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation of waiting and running jobs.

use crate::prelude::*;

/// Canceling a job before any worker exists: readers see CANCELED
/// immediately, and a later worker skips it, rewriting the on-disk state.
#[tokio::test]
async fn cancel_waiting_job_is_skipped_by_worker() {
    let h = Harness::new();
    let doomed = h.push(h.job("doomed", &["echo never"]));
    let survivor = h.push(h.job("survivor", &["echo ok"]));

    cancel::request(&h.home, MACHINE, doomed.id).expect("cancel");

    // reader-side synthesis before any worker runs
    assert_eq!(h.state(doomed.id).running_state, RunningState::Canceled);

    worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts()).await.expect("worker");

    // the skip is durable: the state file itself now says canceled
    let raw: JobState = kochi_core::codec::decode(
        &std::fs::read_to_string(h.home.job_state(MACHINE, doomed.id)).expect("state file"),
    )
    .expect("decode");
    assert_eq!(raw.running_state, RunningState::Canceled);
    assert!(raw.start_time.is_none(), "the job never ran");

    assert_eq!(h.state(survivor.id).running_state, RunningState::Terminated);
    let log = std::fs::read_to_string(h.home.job_log(MACHINE, survivor.id)).expect("log");
    assert!(log.contains("ok"));
}

/// Canceling a running job interrupts it within the watcher's polling
/// interval; the worker survives and keeps serving the queue.
#[tokio::test]
async fn cancel_running_job_interrupts_and_worker_continues() {
    let h = Harness::new();
    let sleeper = h.push(h.job("sleeper", &["sleep 60"]));
    let after = h.push(h.job("after", &["echo ok"]));

    let home = h.home.clone();
    let opts = h.fast_opts();
    let handle =
        tokio::spawn(async move { worker::start(&home, &SystemClock, MACHINE, QUEUE, opts).await });

    // wait until the sleeper is actually running
    let started = wait_for(Duration::from_secs(10), || {
        h.state(sleeper.id).running_state == RunningState::Running
    })
    .await;
    assert!(started, "sleeper never started");

    cancel::request(&h.home, MACHINE, sleeper.id).expect("cancel");

    let canceled = wait_for(Duration::from_secs(10), || {
        let raw: JobState = kochi_core::codec::decode(
            &std::fs::read_to_string(h.home.job_state(MACHINE, sleeper.id)).unwrap_or_default(),
        )
        .unwrap_or_else(|_| JobState::invalid());
        raw.running_state == RunningState::Canceled
    })
    .await;
    assert!(canceled, "sleeper was not canceled in time");

    // the worker finishes the rest of the queue and exits cleanly
    let worker_id = handle.await.expect("join").expect("worker");
    assert_eq!(h.state(after.id).running_state, RunningState::Terminated);
    let ws = worker_store::get(&h.home, MACHINE, worker_id, h.clock.epoch_secs());
    assert_eq!(ws.running_state, RunningState::Terminated);
}

/// An interruption without a cancel flag records ABORTED, not CANCELED.
#[tokio::test]
async fn external_interruption_without_flag_reads_aborted() {
    let h = Harness::new();
    // the script kills its own process group, mimicking an external signal
    let job = h.push(h.job("self-interrupting", &["kill -INT 0", "sleep 5"]));

    worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts()).await.expect("worker");
    assert_eq!(h.state(job.id).running_state, RunningState::Aborted);
}
