// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat record and staleness classification.

use crate::state::RunningState;
use serde::{Deserialize, Serialize};

/// Seconds between ticker rewrites of the heartbeat file.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 3;

/// Grace period before a silent RUNNING heartbeat reads as TERMINATED.
pub const HEARTBEAT_MARGIN_SECS: u64 = 5;

/// State-tagged liveness timestamp, fully rewritten by the ticker on every
/// update so readers never see a partial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub running_state: RunningState,
    pub init_time: u64,
    pub start_time: Option<u64>,
    pub latest_time: u64,
}

impl HeartbeatRecord {
    /// The record written once at worker init.
    pub fn init(now: u64) -> Self {
        Self {
            running_state: RunningState::Waiting,
            init_time: now,
            start_time: None,
            latest_time: now,
        }
    }

    /// Placeholder returned when the file is missing or undecodable.
    pub fn invalid() -> Self {
        Self {
            running_state: RunningState::Invalid,
            init_time: 0,
            start_time: None,
            latest_time: 0,
        }
    }

    /// The next record written by a ticker update. The first tick after
    /// init transitions WAITING to RUNNING and stamps `start_time`.
    pub fn tick(&self, now: u64) -> Self {
        Self {
            running_state: RunningState::Running,
            init_time: self.init_time,
            start_time: Some(self.start_time.unwrap_or(now)),
            latest_time: now,
        }
    }

    /// The final record written when the ticker is told to stop.
    pub fn terminate(&self, now: u64) -> Self {
        Self {
            running_state: RunningState::Terminated,
            init_time: self.init_time,
            start_time: self.start_time,
            latest_time: now,
        }
    }

    /// Reader-side classification: a RUNNING record whose `latest_time`
    /// plus `margin` has passed reads as TERMINATED. The file itself is
    /// never rewritten by readers.
    pub fn classify(&self, margin: u64, now: u64) -> RunningState {
        match self.running_state {
            RunningState::Running if self.latest_time + margin < now => RunningState::Terminated,
            state => state,
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
