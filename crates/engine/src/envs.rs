// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition of the `KOCHI_*` environment surfaced to user scripts.

use indexmap::IndexMap;
use kochi_core::{scalar_text, Job, KochiHome};
use serde_json::Value;

/// `-` → `_`, uppercased; dependency and parameter names become
/// environment-variable suffixes this way.
pub fn upper_snake(name: &str) -> String {
    name.replace('-', "_").to_uppercase()
}

/// `KOCHI_INSTALL_PREFIX_<DEP>` and `KOCHI_RECIPE_<DEP>` for one
/// dependency.
pub fn dep_env(
    home: &KochiHome,
    project: &str,
    machine: &str,
    dep: &str,
    recipe: &str,
) -> IndexMap<String, String> {
    let suffix = upper_snake(dep);
    let mut envs = IndexMap::new();
    envs.insert(
        format!("KOCHI_INSTALL_PREFIX_{suffix}"),
        home.install_prefix(project, machine, dep, recipe).display().to_string(),
    );
    envs.insert(format!("KOCHI_RECIPE_{suffix}"), recipe.to_string());
    envs
}

/// The base environment every phase of a job sees.
pub fn job_base_env(
    machine: &str,
    worker_id: u64,
    queue: &str,
    job: &Job,
) -> IndexMap<String, String> {
    let mut envs = IndexMap::new();
    envs.insert("KOCHI_MACHINE".to_string(), machine.to_string());
    envs.insert("KOCHI_WORKER_ID".to_string(), worker_id.to_string());
    envs.insert("KOCHI_QUEUE".to_string(), queue.to_string());
    envs.insert("KOCHI_JOB_ID".to_string(), job.id.to_string());
    envs.insert("KOCHI_JOB_NAME".to_string(), job.name.clone());
    envs
}

/// `KOCHI_PARAM_<NAME>` for each dependent parameter; booleans render as
/// `true`/`false`.
pub fn param_env(params: &IndexMap<String, Value>) -> IndexMap<String, String> {
    params
        .iter()
        .map(|(name, value)| (format!("KOCHI_PARAM_{}", upper_snake(name)), scalar_text(value)))
        .collect()
}

#[cfg(test)]
#[path = "envs_tests.rs"]
mod tests;
