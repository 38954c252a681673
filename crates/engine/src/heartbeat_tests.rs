// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kochi_core::{RunningState, SystemClock, HEARTBEAT_MARGIN_SECS};

fn home(dir: &tempfile::TempDir) -> KochiHome {
    let home = KochiHome::new(dir.path());
    std::fs::create_dir_all(home.worker_dir("m")).unwrap();
    home
}

#[tokio::test]
async fn init_record_is_written_synchronously() {
    let dir = tempfile::tempdir().unwrap();
    let home = home(&dir);
    let clock = SystemClock;
    let hb = Heartbeat::start(&home, "m", 0, Duration::from_secs(60), clock.clone()).unwrap();

    let record = heartbeat_file::read(
        &home.worker_heartbeat("m", 0),
        HEARTBEAT_MARGIN_SECS,
        clock.epoch_secs(),
    );
    assert_eq!(record.running_state, RunningState::Waiting);
    hb.close().await;
}

#[tokio::test]
async fn ticks_transition_to_running() {
    let dir = tempfile::tempdir().unwrap();
    let home = home(&dir);
    let clock = SystemClock;
    let hb = Heartbeat::start(&home, "m", 1, Duration::from_millis(20), clock.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    let record = heartbeat_file::read(
        &home.worker_heartbeat("m", 1),
        HEARTBEAT_MARGIN_SECS,
        clock.epoch_secs(),
    );
    assert_eq!(record.running_state, RunningState::Running);
    assert!(record.start_time.is_some());
    hb.close().await;
}

#[tokio::test]
async fn close_writes_terminated() {
    let dir = tempfile::tempdir().unwrap();
    let home = home(&dir);
    let clock = SystemClock;
    let hb = Heartbeat::start(&home, "m", 2, Duration::from_millis(20), clock.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    hb.close().await;

    let record = heartbeat_file::read(
        &home.worker_heartbeat("m", 2),
        HEARTBEAT_MARGIN_SECS,
        clock.epoch_secs(),
    );
    assert_eq!(record.running_state, RunningState::Terminated);
}
