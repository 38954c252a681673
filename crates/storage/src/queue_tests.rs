// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use indexmap::IndexMap;
use kochi_core::{BuildConf, RunConf};

fn job(name: &str) -> Job {
    Job {
        id: 0,
        name: name.to_string(),
        machine: "m".to_string(),
        queue: "q".to_string(),
        project: "p".to_string(),
        dependencies: IndexMap::new(),
        context: None,
        params: IndexMap::new(),
        artifacts: Vec::new(),
        activate_script: Vec::new(),
        build: BuildConf::default(),
        run: RunConf { script: vec!["true".to_string()], depend_params: vec![] },
    }
}

#[test]
fn pop_on_missing_queue_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let home = KochiHome::new(dir.path());
    assert!(pop(&home, "m", "q").unwrap().is_none());
}

#[test]
fn jobs_round_trip_in_fifo_order() {
    let dir = tempfile::tempdir().unwrap();
    let home = KochiHome::new(dir.path());
    std::fs::create_dir_all(home.queue_dir("m")).unwrap();

    push(&home, &job("a")).unwrap();
    push(&home, &job("b")).unwrap();

    assert_eq!(pop(&home, "m", "q").unwrap().unwrap().name, "a");
    assert_eq!(pop(&home, "m", "q").unwrap().unwrap().name, "b");
    assert!(pop(&home, "m", "q").unwrap().is_none());
}

#[test]
fn queues_are_isolated_per_machine_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let home = KochiHome::new(dir.path());
    std::fs::create_dir_all(home.queue_dir("m")).unwrap();
    std::fs::create_dir_all(home.queue_dir("n")).unwrap();

    push(&home, &job("a")).unwrap();
    let mut other = job("b");
    other.machine = "n".to_string();
    push(&home, &other).unwrap();

    assert!(pop(&home, "m", "other").unwrap().is_none());
    assert_eq!(pop(&home, "n", "q").unwrap().unwrap().name, "b");
    assert_eq!(pop(&home, "m", "q").unwrap().unwrap().name, "a");
}

#[test]
fn corrupt_queue_line_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let home = KochiHome::new(dir.path());
    std::fs::create_dir_all(home.queue_dir("m")).unwrap();
    std::fs::write(home.queue_file("m", "q"), "garbage line\n").unwrap();
    assert!(pop(&home, "m", "q").is_err());
}
