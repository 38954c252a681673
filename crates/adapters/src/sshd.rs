// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional inspection sshd for a running worker.
//!
//! Workers on compute nodes are often unreachable by normal means; when
//! an `sshd` binary and a prepared config exist, each worker runs its own
//! daemon so the user can log into the node for inspection. Key and
//! config provisioning is external tooling; absent either piece the
//! worker simply runs without it.

use kochi_core::KochiHome;
use std::path::PathBuf;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub const ENV_SSH_PORT: &str = "KOCHI_SSH_PORT";
pub const DEFAULT_SSH_PORT: u16 = 2022;

pub struct InspectionSshd {
    child: Child,
}

/// Start the inspection daemon if possible; `None` means the worker runs
/// without one.
pub fn try_start(home: &KochiHome, machine: &str, worker_id: u64) -> Option<InspectionSshd> {
    let config = home.sshd_config();
    if !config.is_file() {
        debug!(config = %config.display(), "no sshd config, skipping inspection sshd");
        return None;
    }
    let Some(sshd) = find_sshd() else {
        warn!("sshd is not available; 'inspect' will not work for this worker");
        return None;
    };

    let var_run = home.sshd_var_run(machine, worker_id);
    if let Err(e) = std::fs::create_dir_all(&var_run) {
        warn!(error = %e, "could not create sshd run dir, skipping inspection sshd");
        return None;
    }

    let port = std::env::var(ENV_SSH_PORT)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_SSH_PORT);

    let mut cmd = Command::new(sshd);
    cmd.arg("-f")
        .arg(&config)
        .arg("-D")
        .arg("-o")
        .arg(format!("PidFile={}/sshd.pid", var_run.display()))
        .arg("-p")
        .arg(port.to_string())
        .kill_on_drop(true);

    match cmd.spawn() {
        Ok(child) => {
            debug!(port, "inspection sshd started");
            Some(InspectionSshd { child })
        }
        Err(e) => {
            warn!(error = %e, "could not start inspection sshd");
            None
        }
    }
}

impl InspectionSshd {
    pub async fn stop(mut self) {
        let _ = self.child.kill().await;
    }
}

fn find_sshd() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = std::env::var_os("PATH") {
        candidates.extend(std::env::split_paths(&path).map(|dir| dir.join("sshd")));
    }
    candidates.push(PathBuf::from("/usr/sbin/sshd"));
    candidates.push(PathBuf::from("/usr/local/sbin/sshd"));
    candidates.into_iter().find(|p| p.is_file())
}
