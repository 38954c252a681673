// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kochi-core: records, codecs, paths, and parameter handling for the
//! kochi job-execution harness.

pub mod macros;

pub mod clock;
pub mod codec;
pub mod context;
pub mod heartbeat;
pub mod install;
pub mod job;
pub mod params;
pub mod paths;
pub mod state;
pub mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use codec::{decode, encode, CodecError};
pub use context::Context;
pub use heartbeat::{HeartbeatRecord, HEARTBEAT_INTERVAL_SECS, HEARTBEAT_MARGIN_SECS};
pub use install::{InstallConf, InstallState};
pub use job::{
    ArtifactKind, ArtifactSpec, BuildConf, BuildFingerprint, Job, JobState, RunConf,
};
pub use params::{expand, product, scalar_text, substitute, ParamError, Params};
pub use paths::KochiHome;
pub use state::RunningState;
pub use worker::WorkerState;
