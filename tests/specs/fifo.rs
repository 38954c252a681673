// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FIFO dispatch: single worker in order, multiple workers exactly-once.

use crate::prelude::*;

/// Three jobs on one queue, one worker: states transition in enqueue
/// order and the worker's own state ends terminated.
#[tokio::test]
async fn single_worker_runs_jobs_in_order() {
    let h = Harness::new();
    let a = h.push(h.job("a", &["true"]));
    let b = h.push(h.job("b", &["true"]));
    let c = h.push(h.job("c", &["true"]));

    let worker_id = worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts())
        .await
        .expect("worker");

    for job in [&a, &b, &c] {
        let state = h.state(job.id);
        assert_eq!(state.running_state, RunningState::Terminated, "job {}", job.name);
        assert_eq!(state.worker_id, Some(worker_id));
        assert!(state.init_time <= state.start_time.unwrap());
        assert!(state.start_time.unwrap() <= state.latest_time.unwrap());
    }

    // dequeue order matches enqueue order
    let start = |id: u64| h.state(id).start_time.unwrap();
    assert!(start(a.id) <= start(b.id));
    assert!(start(b.id) <= start(c.id));

    let ws = worker_store::get(&h.home, MACHINE, worker_id, h.clock.epoch_secs());
    assert_eq!(ws.running_state, RunningState::Terminated);
    assert_eq!(ws.queue, QUEUE);
}

/// Forty trivial jobs, four competing workers: every job is processed
/// exactly once and the worker ids are distinct.
#[tokio::test]
async fn competing_workers_process_each_job_exactly_once() {
    let h = Harness::new();
    let n = 40u64;
    for i in 0..n {
        h.push(h.job(&format!("job-{i}"), &["true"]));
    }

    let spawn = |home: KochiHome, opts: WorkerOptions| {
        tokio::spawn(async move { worker::start(&home, &SystemClock, MACHINE, QUEUE, opts).await })
    };
    let w0 = spawn(h.home.clone(), h.fast_opts());
    let w1 = spawn(h.home.clone(), h.fast_opts());
    let w2 = spawn(h.home.clone(), h.fast_opts());
    let w3 = spawn(h.home.clone(), h.fast_opts());

    let mut worker_ids = Vec::new();
    for handle in [w0, w1, w2, w3] {
        worker_ids.push(handle.await.expect("join").expect("worker"));
    }
    worker_ids.sort_unstable();
    worker_ids.dedup();
    assert_eq!(worker_ids.len(), 4);

    for id in 0..n {
        let state = h.state(id);
        assert_eq!(state.running_state, RunningState::Terminated, "job {id}");
        let wid = state.worker_id.expect("assigned worker");
        assert!(worker_ids.contains(&wid));
    }

    // the queue is fully drained
    assert!(queue::pop(&h.home, MACHINE, QUEUE).expect("pop").is_none());
}

/// Workers on other queues never steal jobs.
#[tokio::test]
async fn queues_do_not_interfere() {
    let h = Harness::new();
    let job = h.push(h.job("stays", &["true"]));

    // a worker on a different queue drains nothing
    worker::start(&h.home, &h.clock, MACHINE, "other", h.fast_opts()).await.expect("worker");
    assert_eq!(h.state(job.id).running_state, RunningState::Waiting);

    worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts()).await.expect("worker");
    assert_eq!(h.state(job.id).running_state, RunningState::Terminated);
}

/// Job output lands in the job log, bracketed by worker banners in the
/// worker log.
#[tokio::test]
async fn job_output_is_captured_in_logs() {
    let h = Harness::new();
    let job = h.push(h.job("echoer", &["echo unmistakable-marker"]));
    let worker_id = worker::start(&h.home, &h.clock, MACHINE, QUEUE, h.fast_opts())
        .await
        .expect("worker");

    let job_log = std::fs::read_to_string(h.home.job_log(MACHINE, job.id)).expect("job log");
    assert!(job_log.contains("unmistakable-marker"));

    let worker_log =
        std::fs::read_to_string(h.home.worker_log(MACHINE, worker_id)).expect("worker log");
    assert!(worker_log.contains("unmistakable-marker"));
    assert!(worker_log.contains(&format!("Kochi worker {worker_id} started")));
    assert!(worker_log.contains(&format!("Kochi job echoer (ID={}) started.", job.id)));
}
