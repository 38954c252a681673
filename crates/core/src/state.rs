// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running-state variants shared by jobs, workers, and heartbeats.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job, worker, or heartbeat record.
///
/// Jobs use the full set. Heartbeats only ever store `Invalid`, `Waiting`,
/// `Running`, or `Terminated`; the remaining variants are derived by readers
/// (`Killed` from a dead worker's heartbeat, `Canceled` from a cancel flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningState {
    Invalid,
    Waiting,
    Running,
    Terminated,
    Aborted,
    Canceled,
    Killed,
}

impl RunningState {
    /// A state that no longer changes on its own.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunningState::Terminated
                | RunningState::Aborted
                | RunningState::Canceled
                | RunningState::Killed
        )
    }

    /// Waiting or running.
    pub fn is_active(self) -> bool {
        matches!(self, RunningState::Waiting | RunningState::Running)
    }
}

crate::simple_display! {
    RunningState {
        Invalid => "invalid",
        Waiting => "waiting",
        Running => "running",
        Terminated => "terminated",
        Aborted => "aborted",
        Canceled => "canceled",
        Killed => "killed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(RunningState::Terminated.is_terminal());
        assert!(RunningState::Aborted.is_terminal());
        assert!(RunningState::Canceled.is_terminal());
        assert!(RunningState::Killed.is_terminal());
        assert!(!RunningState::Waiting.is_terminal());
        assert!(!RunningState::Running.is_terminal());
        assert!(!RunningState::Invalid.is_terminal());
    }

    #[test]
    fn active_states() {
        assert!(RunningState::Waiting.is_active());
        assert!(RunningState::Running.is_active());
        assert!(!RunningState::Terminated.is_active());
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(RunningState::Killed.to_string(), "killed");
        assert_eq!(RunningState::Waiting.to_string(), "waiting");
    }
}
