// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text job detail rendering.
//!
//! Backs `type = stats` artifacts; the layout is stable so downstream
//! tooling can diff published stats across runs.

use chrono::DateTime;
use kochi_core::{InstallState, KochiHome};
use kochi_storage::job_store;
use std::fmt::Write as _;

fn fmt_time(secs: u64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn fmt_opt_time(secs: Option<u64>) -> String {
    secs.map(fmt_time).unwrap_or_else(|| "-".to_string())
}

fn fmt_elapsed(start: Option<u64>, latest: Option<u64>) -> String {
    match (start, latest) {
        (Some(start), Some(latest)) if latest >= start => format!("{}s", latest - start),
        _ => "-".to_string(),
    }
}

fn field(out: &mut String, key: &str, value: String) {
    let _ = writeln!(out, "{key:<16}{value}");
}

/// Render the current state of a job as aligned key/value text.
pub fn render_job_detail(home: &KochiHome, machine: &str, job_id: u64, now: u64) -> String {
    let state = job_store::get(home, machine, job_id, now);
    let mut out = String::new();

    field(&mut out, "Job ID:", job_id.to_string());
    field(&mut out, "Job Name:", state.name.clone());
    field(&mut out, "Running State:", state.running_state.to_string());
    field(&mut out, "Queue:", state.queue.clone());
    field(
        &mut out,
        "Worker ID:",
        state.worker_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
    );
    field(&mut out, "Created Time:", fmt_time(state.init_time));
    field(&mut out, "Start Time:", fmt_opt_time(state.start_time));
    field(&mut out, "Running Time:", fmt_elapsed(state.start_time, state.latest_time));
    match &state.context {
        Some(ctx) => {
            field(&mut out, "Context Ref:", ctx.reference.clone());
            field(
                &mut out,
                "Context Diff:",
                ctx.diff
                    .as_ref()
                    .map(|d| format!("{} bytes", d.len()))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        None => {
            field(&mut out, "Context Ref:", "-".to_string());
            field(&mut out, "Context Diff:", "-".to_string());
        }
    }

    let _ = writeln!(out, "Build Parameters:");
    for (name, value) in &state.build_params {
        let _ = writeln!(out, "  {name}={}", kochi_core::scalar_text(value));
    }
    let _ = writeln!(out, "Run Parameters:");
    for (name, value) in &state.run_params {
        let _ = writeln!(out, "  {name}={}", kochi_core::scalar_text(value));
    }
    let _ = writeln!(out, "Environment Variables:");
    for (key, value) in &state.envs {
        let _ = writeln!(out, "  {key}={value}");
    }
    let _ = writeln!(out, "Activate Script:");
    for line in &state.activate_script {
        let _ = writeln!(out, "  {line}");
    }
    let _ = writeln!(out, "Build Script:");
    for line in &state.build_script {
        let _ = writeln!(out, "  {line}");
    }
    let _ = writeln!(out, "Run Script:");
    for line in &state.run_script {
        let _ = writeln!(out, "  {line}");
    }

    for dep in &state.dependency_states {
        let _ = writeln!(out);
        let _ = write!(out, "{}", render_install_detail(dep));
    }
    out
}

/// Render one install state section.
pub fn render_install_detail(state: &InstallState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dependency {}:{}:", state.dependency, state.recipe);
    let _ = writeln!(out, "  Installed Time: {}", fmt_time(state.installed_time / 1000));
    if let Some(ctx) = &state.context {
        let _ = writeln!(out, "  Context Ref:    {}", ctx.reference);
    }
    if let Some(hash) = &state.commit_hash {
        let _ = writeln!(out, "  Commit Hash:    {hash}");
    }
    for dep in &state.recipe_dependency_states {
        let _ = writeln!(
            out,
            "  Recipe Dependency: {}:{} @ {}",
            dep.dependency,
            dep.recipe,
            fmt_time(dep.installed_time / 1000)
        );
    }
    out
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
