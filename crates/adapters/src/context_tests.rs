// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::process::Command;

/// Shell out to git synchronously for fixture setup.
fn sh_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed in {}", args, dir.display());
}

fn init_repo(dir: &Path) {
    sh_git(dir, &["init", "-q", "-b", "main"]);
    sh_git(dir, &["config", "user.name", "test"]);
    sh_git(dir, &["config", "user.email", "test@example.com"]);
}

fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(dir.join(name), content).unwrap();
    sh_git(dir, &["add", name]);
    sh_git(dir, &["commit", "-q", "-m", message]);
}

#[tokio::test]
async fn capture_records_project_and_head() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = tmp.path().join("myproj");
    std::fs::create_dir(&repo).unwrap();
    init_repo(&repo);
    commit_file(&repo, "a.txt", "one\n", "initial");

    let ctx = capture(&repo, None).await.unwrap();
    assert_eq!(ctx.project, "myproj");
    assert_eq!(ctx.reference.len(), 40);
    assert_eq!(ctx.diff, None);
}

#[tokio::test]
async fn capture_includes_untracked_files_in_diff() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = tmp.path().join("proj");
    std::fs::create_dir(&repo).unwrap();
    init_repo(&repo);
    commit_file(&repo, "a.txt", "one\n", "initial");
    std::fs::write(repo.join("new.txt"), "fresh\n").unwrap();

    let ctx = capture(&repo, None).await.unwrap();
    let diff = ctx.diff.expect("diff should capture the untracked file");
    assert!(diff.contains("new.txt"));
}

#[tokio::test]
async fn replay_reproduces_tree_with_diff() {
    let tmp = tempfile::tempdir().unwrap();
    let home = KochiHome::new(tmp.path().join("kochi"));
    let repo = tmp.path().join("proj");
    std::fs::create_dir(&repo).unwrap();
    init_repo(&repo);
    commit_file(&repo, "a.txt", "one\n", "initial");

    // dirty the tree: modify a tracked file, add an untracked one
    std::fs::write(repo.join("a.txt"), "one\ntwo\n").unwrap();
    std::fs::write(repo.join("b.txt"), "untracked\n").unwrap();

    let remote = repo.display().to_string();
    let ctx = capture(&repo, Some(remote)).await.unwrap();
    assert!(ctx.diff.is_some());

    let workspace = tmp.path().join("workspace");
    std::fs::create_dir(&workspace).unwrap();
    let replayed = replay(&home, &ctx, &workspace).await.unwrap();

    assert_eq!(replayed, workspace.join("proj"));
    assert_eq!(std::fs::read_to_string(replayed.join("a.txt")).unwrap(), "one\ntwo\n");
    assert_eq!(std::fs::read_to_string(replayed.join("b.txt")).unwrap(), "untracked\n");
}

#[tokio::test]
async fn replay_twice_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let home = KochiHome::new(tmp.path().join("kochi"));
    let repo = tmp.path().join("proj");
    std::fs::create_dir(&repo).unwrap();
    init_repo(&repo);
    commit_file(&repo, "a.txt", "one\n", "initial");
    std::fs::write(repo.join("a.txt"), "changed\n").unwrap();

    let remote = repo.display().to_string();
    let ctx = capture(&repo, Some(remote)).await.unwrap();

    let workspace = tmp.path().join("workspace");
    std::fs::create_dir(&workspace).unwrap();
    let first = replay(&home, &ctx, &workspace).await.unwrap();
    let second = replay(&home, &ctx, &workspace).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(second.join("a.txt")).unwrap(), "changed\n");
}

#[tokio::test]
async fn replay_clones_from_machine_local_mirror_when_no_remote() {
    let tmp = tempfile::tempdir().unwrap();
    let home = KochiHome::new(tmp.path().join("kochi"));
    let repo = tmp.path().join("proj");
    std::fs::create_dir(&repo).unwrap();
    init_repo(&repo);
    commit_file(&repo, "a.txt", "one\n", "initial");

    // stand in for the per-project bare mirror
    let mirror = home.project_git("proj");
    std::fs::create_dir_all(mirror.parent().unwrap()).unwrap();
    sh_git(tmp.path(), &["clone", "-q", "--bare", &repo.display().to_string(), &mirror.display().to_string()]);

    let ctx = capture(&repo, None).await.unwrap();
    let workspace = tmp.path().join("workspace");
    std::fs::create_dir(&workspace).unwrap();
    let replayed = replay(&home, &ctx, &workspace).await.unwrap();
    assert_eq!(std::fs::read_to_string(replayed.join("a.txt")).unwrap(), "one\n");
}

#[tokio::test]
async fn replay_fails_when_diff_cannot_apply() {
    let tmp = tempfile::tempdir().unwrap();
    let home = KochiHome::new(tmp.path().join("kochi"));
    let repo = tmp.path().join("proj");
    std::fs::create_dir(&repo).unwrap();
    init_repo(&repo);
    commit_file(&repo, "a.txt", "one\n", "initial");

    let remote = repo.display().to_string();
    let mut ctx = capture(&repo, Some(remote)).await.unwrap();
    ctx.diff = Some("not a diff at all\n".to_string());

    let workspace = tmp.path().join("workspace");
    std::fs::create_dir(&workspace).unwrap();
    assert!(replay(&home, &ctx, &workspace).await.is_err());
}
