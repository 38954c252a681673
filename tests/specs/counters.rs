// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent producers: distinct dense ids, every record popped once.

use crate::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Four producer threads pushing 25 jobs each receive 100 distinct ids
/// covering [0, 100), and the queue yields each record exactly once.
#[test]
fn concurrent_producers_get_distinct_dense_ids() {
    let h = Harness::new();
    let home = Arc::new(h.home.clone());

    let mut handles = Vec::new();
    for producer in 0..4 {
        let home = Arc::clone(&home);
        handles.push(std::thread::spawn(move || {
            let clock = SystemClock;
            let mut ids = Vec::new();
            for i in 0..25 {
                let job = Job {
                    id: 0,
                    name: format!("p{producer}-{i}"),
                    machine: MACHINE.to_string(),
                    queue: QUEUE.to_string(),
                    project: "proj".to_string(),
                    dependencies: IndexMap::new(),
                    context: None,
                    params: IndexMap::new(),
                    artifacts: Vec::new(),
                    activate_script: Vec::new(),
                    build: BuildConf::default(),
                    run: RunConf { script: vec!["true".to_string()], depend_params: vec![] },
                };
                ids.push(queue::push(&home, &clock, job).expect("push").id);
            }
            ids
        }));
    }

    let mut all_ids = Vec::new();
    for handle in handles {
        all_ids.extend(handle.join().expect("join"));
    }
    let unique: HashSet<u64> = all_ids.iter().copied().collect();
    assert_eq!(unique.len(), 100);
    assert_eq!(*all_ids.iter().min().unwrap(), 0);
    assert_eq!(*all_ids.iter().max().unwrap(), 99);

    // competing consumers pop every record exactly once
    let mut consumers = Vec::new();
    for _ in 0..2 {
        let home = Arc::clone(&home);
        consumers.push(std::thread::spawn(move || {
            let mut names = Vec::new();
            while let Some(job) = queue::pop(&home, MACHINE, QUEUE).expect("pop") {
                names.push(job.name);
            }
            names
        }));
    }
    let mut all_names = Vec::new();
    for consumer in consumers {
        all_names.extend(consumer.join().expect("join"));
    }
    assert_eq!(all_names.len(), 100);
    let unique: HashSet<String> = all_names.iter().cloned().collect();
    assert_eq!(unique.len(), 100);
}

/// Every pushed job has a WAITING state on disk before it can be popped.
#[test]
fn popped_jobs_always_have_state_files() {
    let h = Harness::new();
    for i in 0..10 {
        h.push(h.job(&format!("job-{i}"), &["true"]));
    }
    while let Some(job) = queue::pop(&h.home, MACHINE, QUEUE).expect("pop") {
        let state = h.state(job.id);
        assert_eq!(state.running_state, RunningState::Waiting);
    }
}
