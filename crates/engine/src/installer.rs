// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe installer.
//!
//! Builds a dependency's recipe into its stamped prefix. On success the
//! install state records the full effective environment, the resolved
//! commit hash, and a recursive snapshot of every recipe dependency's
//! state, which the consistency check later compares against the current
//! states.

use crate::envs;
use kochi_adapters::script::{self, ScriptStatus};
use kochi_adapters::{context, GitError, ScriptError, Tee};
use kochi_core::{codec, Clock, InstallConf, InstallState, KochiHome};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("dependency {dependency}:{recipe} is not installed for project '{project}' on machine '{machine}'; install it first")]
    NotInstalled {
        project: String,
        machine: String,
        dependency: String,
        recipe: String,
    },

    #[error(
        "dependency {dependency}:{recipe} was re-installed at {current_time} after '{dependent}' \
         was built against it at {recorded_time}; re-install '{dependent}'"
    )]
    DependencyStale {
        dependent: String,
        dependency: String,
        recipe: String,
        recorded_time: u64,
        current_time: u64,
    },

    #[error("install script for {dependency}:{recipe} exited with status {status}")]
    ScriptFailed {
        dependency: String,
        recipe: String,
        status: i32,
    },

    #[error("install for {dependency}:{recipe} was interrupted")]
    Interrupted { dependency: String, recipe: String },

    #[error(transparent)]
    Codec(#[from] kochi_core::CodecError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> InstallerError + '_ {
    move |source| InstallerError::Io { path: path.to_path_buf(), source }
}

/// Load the current install state; fails loudly when absent or unreadable.
pub fn get_state(
    home: &KochiHome,
    project: &str,
    machine: &str,
    dependency: &str,
    recipe: &str,
) -> Result<InstallState, InstallerError> {
    let path = home.install_state(project, machine, dependency, recipe);
    let not_installed = || InstallerError::NotInstalled {
        project: project.to_string(),
        machine: machine.to_string(),
        dependency: dependency.to_string(),
        recipe: recipe.to_string(),
    };
    let content = std::fs::read_to_string(&path).map_err(|_| not_installed())?;
    codec::decode(&content).map_err(|_| not_installed())
}

/// Environment map for a set of declared dependencies.
pub fn deps_env(
    home: &KochiHome,
    project: &str,
    machine: &str,
    dependencies: &IndexMap<String, String>,
) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for (dep, recipe) in dependencies {
        out.extend(envs::dep_env(home, project, machine, dep, recipe));
    }
    out
}

/// Load each declared dependency's current state and verify that every
/// transitive snapshot still matches the installed reality. Returns the
/// states in declaration order.
pub fn check_dependencies(
    home: &KochiHome,
    project: &str,
    machine: &str,
    dependencies: &IndexMap<String, String>,
) -> Result<Vec<InstallState>, InstallerError> {
    let mut states = Vec::new();
    for (dep, recipe) in dependencies {
        let state = get_state(home, project, machine, dep, recipe)?;
        verify_transitive(home, project, machine, &state)?;
        states.push(state);
    }
    Ok(states)
}

fn verify_transitive(
    home: &KochiHome,
    project: &str,
    machine: &str,
    state: &InstallState,
) -> Result<(), InstallerError> {
    for snapshot in &state.recipe_dependency_states {
        let current = get_state(home, project, machine, &snapshot.dependency, &snapshot.recipe)?;
        if current.installed_time != snapshot.installed_time {
            return Err(InstallerError::DependencyStale {
                dependent: format!("{}:{}", state.dependency, state.recipe),
                dependency: snapshot.dependency.clone(),
                recipe: snapshot.recipe.clone(),
                recorded_time: snapshot.installed_time,
                current_time: current.installed_time,
            });
        }
        verify_transitive(home, project, machine, snapshot)?;
    }
    Ok(())
}

/// Build one recipe. The source and destination directories are purged
/// and recreated, the context (if any) is replayed inside the source
/// tree, and the activate + install script runs as one shell pipeline
/// with the composed environment. State is written only on success; a
/// failed install leaves no state file behind.
pub async fn install<C: Clock>(
    home: &KochiHome,
    conf: &InstallConf,
    machine: &str,
    clock: &C,
) -> Result<InstallState, InstallerError> {
    // recipe dependencies must already be installed
    let mut dep_envs = IndexMap::new();
    for (dep, recipe) in &conf.recipe_dependencies {
        get_state(home, &conf.project, machine, dep, recipe)?;
        dep_envs.extend(envs::dep_env(home, &conf.project, machine, dep, recipe));
    }

    let prefix = home.install_prefix(&conf.project, machine, &conf.dependency, &conf.recipe);
    let src = home.install_src(&conf.project, machine, &conf.dependency, &conf.recipe);
    recreate_dir(&prefix)?;
    recreate_dir(&src)?;

    let workdir = match &conf.context {
        Some(ctx) => context::replay(home, ctx, &src).await?,
        None => src.clone(),
    };

    let log_path = home.install_log(&conf.project, machine, &conf.dependency, &conf.recipe);
    let tee = Tee::to_stdout(&log_path).await.map_err(io_at(&log_path))?;
    let ruler = "*".repeat(80);
    tee.line(&format!(
        "Kochi installation for {}:{} started on machine {}.",
        conf.dependency, conf.recipe, machine
    ))
    .await
    .map_err(io_at(&log_path))?;
    tee.line(&ruler).await.map_err(io_at(&log_path))?;

    let mut script_envs: IndexMap<String, String> = IndexMap::new();
    script_envs.insert("KOCHI_MACHINE".to_string(), machine.to_string());
    script_envs.insert("KOCHI_INSTALL_PREFIX".to_string(), prefix.display().to_string());
    script_envs.extend(dep_envs);
    script_envs.extend(conf.envs.clone());

    let mut lines = conf.activate_script.clone();
    lines.extend(conf.script.clone());
    let process = script::spawn(&lines, &workdir, &script_envs)?;
    let status = process.stream_to(&tee).await?;

    let result = match status {
        ScriptStatus::Success => {
            let state = on_complete(home, conf, machine, &workdir, script_envs, clock).await?;
            info!(
                dependency = %conf.dependency,
                recipe = %conf.recipe,
                machine,
                "install completed"
            );
            Ok(state)
        }
        ScriptStatus::Failed(status) => {
            tee.line(&format!(
                "Kochi installation for {}:{} failed with status {}.",
                conf.dependency, conf.recipe, status
            ))
            .await
            .map_err(io_at(&log_path))?;
            Err(InstallerError::ScriptFailed {
                dependency: conf.dependency.clone(),
                recipe: conf.recipe.clone(),
                status,
            })
        }
        ScriptStatus::Interrupted => {
            tee.line(&format!(
                "Kochi installation for {}:{} interrupted.",
                conf.dependency, conf.recipe
            ))
            .await
            .map_err(io_at(&log_path))?;
            Err(InstallerError::Interrupted {
                dependency: conf.dependency.clone(),
                recipe: conf.recipe.clone(),
            })
        }
    };

    tee.line(&ruler).await.map_err(io_at(&log_path))?;
    result
}

/// Snapshot the current states of all recipe dependencies and write this
/// recipe's install state with the resolved commit hash.
async fn on_complete<C: Clock>(
    home: &KochiHome,
    conf: &InstallConf,
    machine: &str,
    workdir: &Path,
    effective_envs: IndexMap<String, String>,
    clock: &C,
) -> Result<InstallState, InstallerError> {
    let mut snapshots = Vec::new();
    for (dep, recipe) in &conf.recipe_dependencies {
        snapshots.push(get_state(home, &conf.project, machine, dep, recipe)?);
    }

    let commit_hash = match &conf.context {
        Some(ctx) => Some(kochi_adapters::git::rev_parse(workdir, &ctx.reference).await?),
        None => None,
    };

    let state = InstallState::on_complete(conf, snapshots, effective_envs, commit_hash, clock.epoch_ms());
    let path = home.install_state(&conf.project, machine, &conf.dependency, &conf.recipe);
    let encoded = codec::encode(&state)?;
    std::fs::write(&path, encoded).map_err(io_at(&path))?;
    Ok(state)
}

fn recreate_dir(path: &Path) -> Result<(), InstallerError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(io_at(path))?;
    }
    std::fs::create_dir_all(path).map_err(io_at(path))
}

#[cfg(test)]
#[path = "installer_tests.rs"]
mod tests;
