// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency staleness: a re-installed dependency invalidates its
//! dependents at enqueue time.

use crate::prelude::*;
use kochi_core::{Context, InstallConf};
use kochi_engine::{installer, InstallerError, QueueError};

fn conf(dep: &str, deps: &[(&str, &str)]) -> InstallConf {
    InstallConf {
        project: "proj".to_string(),
        dependency: dep.to_string(),
        recipe: "r".to_string(),
        on_machine: false,
        recipe_dependencies: deps.iter().map(|(d, r)| (d.to_string(), r.to_string())).collect(),
        context: None,
        envs: IndexMap::new(),
        activate_script: Vec::new(),
        script: vec!["true".to_string()],
    }
}

fn job_depending_on_bar(h: &Harness) -> Job {
    let mut job = h.job("consumer", &["true"]);
    job.context = Some(Context::new("proj", "deadbeef"));
    job.dependencies.insert("bar".to_string(), "r".to_string());
    job
}

/// Install foo, install bar (which depends on foo), re-install foo:
/// enqueueing a job that depends on bar fails naming foo and both
/// install timestamps.
#[tokio::test]
async fn reinstalled_transitive_dependency_blocks_enqueue() {
    let h = Harness::new();
    installer::install(&h.home, &conf("foo", &[]), MACHINE, &h.clock).await.expect("install foo");
    installer::install(&h.home, &conf("bar", &[("foo", "r")]), MACHINE, &h.clock)
        .await
        .expect("install bar");

    // consistent while nothing moved
    h.push(job_depending_on_bar(&h));

    // re-install foo; bar's snapshot of foo is now stale
    tokio::time::sleep(Duration::from_millis(5)).await;
    installer::install(&h.home, &conf("foo", &[]), MACHINE, &h.clock).await.expect("reinstall foo");

    let err = queue::push(&h.home, &h.clock, job_depending_on_bar(&h)).expect_err("stale enqueue");
    match err {
        QueueError::Installer(InstallerError::DependencyStale {
            dependent,
            dependency,
            recipe,
            recorded_time,
            current_time,
        }) => {
            assert_eq!(dependent, "bar:r");
            assert_eq!(dependency, "foo");
            assert_eq!(recipe, "r");
            assert!(recorded_time < current_time);
        }
        other => panic!("expected DependencyStale, got {other}"),
    }

    // re-installing bar repairs the chain
    installer::install(&h.home, &conf("bar", &[("foo", "r")]), MACHINE, &h.clock)
        .await
        .expect("reinstall bar");
    h.push(job_depending_on_bar(&h));
}

/// Enqueueing against a dependency that was never installed fails fast.
#[tokio::test]
async fn missing_dependency_blocks_enqueue() {
    let h = Harness::new();
    let err = queue::push(&h.home, &h.clock, job_depending_on_bar(&h)).expect_err("missing dep");
    assert!(matches!(
        err,
        QueueError::Installer(InstallerError::NotInstalled { .. })
    ));
}

/// The snapshot taken at enqueue time is persisted into the job state.
#[tokio::test]
async fn job_state_snapshots_dependency_states() {
    let h = Harness::new();
    installer::install(&h.home, &conf("foo", &[]), MACHINE, &h.clock).await.expect("install foo");
    installer::install(&h.home, &conf("bar", &[("foo", "r")]), MACHINE, &h.clock)
        .await
        .expect("install bar");

    let job = h.push(job_depending_on_bar(&h));
    let state = h.state(job.id);
    assert_eq!(state.dependency_states.len(), 1);
    assert_eq!(state.dependency_states[0].dependency, "bar");
    assert_eq!(state.dependency_states[0].recipe_dependency_states[0].dependency, "foo");
}
