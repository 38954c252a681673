// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker state record.

use crate::state::RunningState;
use serde::{Deserialize, Serialize};

/// Per-worker persistent state. Written at init; liveness fields are
/// refreshed from the worker's heartbeat on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerState {
    pub running_state: RunningState,
    pub queue: String,
    pub init_time: u64,
    pub start_time: Option<u64>,
    pub latest_time: Option<u64>,
}

impl WorkerState {
    pub fn waiting(queue: impl Into<String>, now: u64) -> Self {
        Self {
            running_state: RunningState::Waiting,
            queue: queue.into(),
            init_time: now,
            start_time: None,
            latest_time: None,
        }
    }

    pub fn invalid() -> Self {
        Self {
            running_state: RunningState::Invalid,
            queue: String::new(),
            init_time: 0,
            start_time: None,
            latest_time: None,
        }
    }
}
