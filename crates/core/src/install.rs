// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe install configuration and version-stamped install state.

use crate::context::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Everything the installer needs to build one recipe of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConf {
    pub project: String,
    pub dependency: String,
    pub recipe: String,
    /// Built on the compute node rather than the login node.
    pub on_machine: bool,
    /// Ordered recipe dependencies, name → recipe variant. These must all
    /// be installed before this recipe.
    pub recipe_dependencies: IndexMap<String, String>,
    pub context: Option<Context>,
    pub envs: IndexMap<String, String>,
    pub activate_script: Vec<String>,
    pub script: Vec<String>,
}

/// State written into the install prefix on successful completion.
///
/// `recipe_dependency_states` snapshots the InstallState of every recipe
/// dependency at install time, recursively. A dependent is only usable
/// while each snapshot's `installed_time` still matches the dependency's
/// current state; a re-install of any transitive dependency makes every
/// dependent stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallState {
    pub project: String,
    pub dependency: String,
    pub recipe: String,
    pub on_machine: bool,
    pub recipe_dependency_states: Vec<InstallState>,
    pub context: Option<Context>,
    /// Full effective environment at build time.
    pub envs: IndexMap<String, String>,
    pub activate_script: Vec<String>,
    pub script: Vec<String>,
    /// Epoch milliseconds; the identity used by the staleness check.
    pub installed_time: u64,
    /// Resolved from `context.reference` at install time.
    pub commit_hash: Option<String>,
}

impl InstallState {
    /// Build the completed state for `conf` from the freshly-loaded states
    /// of its recipe dependencies.
    pub fn on_complete(
        conf: &InstallConf,
        recipe_dependency_states: Vec<InstallState>,
        envs: IndexMap<String, String>,
        commit_hash: Option<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            project: conf.project.clone(),
            dependency: conf.dependency.clone(),
            recipe: conf.recipe.clone(),
            on_machine: conf.on_machine,
            recipe_dependency_states,
            context: conf.context.clone(),
            envs,
            activate_script: conf.activate_script.clone(),
            script: conf.script.clone(),
            installed_time: now_ms,
            commit_hash,
        }
    }
}
