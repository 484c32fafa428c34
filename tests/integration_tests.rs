//! Integration tests for the opp binary

#![allow(deprecated)] // cargo_bin is the standard way to test CLI binaries

mod common;

use assert_cmd::Command;
use common::{GIT_ENV, TempGitRepo};
use predicates::prelude::*;
use tempfile::TempDir;

fn opp() -> Command {
    let mut cmd = Command::cargo_bin("opp").unwrap();
    cmd.envs(GIT_ENV.iter().copied()).env_remove("OPP_LOG");
    cmd
}

fn opp_in(repo: &TempGitRepo) -> Command {
    let mut cmd = opp();
    cmd.arg("-C").arg(repo.root());
    cmd
}

// =============================================================================
// CLI Tests
// =============================================================================

#[test]
fn test_cli_help() {
    opp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stacked pull requests"));
}

#[test]
fn test_cli_version() {
    opp()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_pr_help() {
    opp()
        .args(["pr", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base"))
        .stdout(predicate::str::contains("--draft"))
        .stdout(predicate::str::contains("--extract"))
        .stdout(predicate::str::contains("--interactive"));
}

#[test]
fn test_command_aliases() {
    for alias in ["new", "pull-request", "up", "reb", "pull", "m", "gc", "s", "abandon", "co", "b", "branch"] {
        opp().args([alias, "--help"]).assert().success();
    }
}

#[test]
fn test_invalid_merge_method() {
    opp()
        .args(["merge", "--method", "octopus"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_path() {
    opp()
        .args(["--path", "/nonexistent/path/to/repo", "status"])
        .assert()
        .failure();
}

#[test]
fn test_outside_git_repository() {
    let dir = TempDir::new().unwrap();
    opp()
        .arg("-C")
        .arg(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not inside a git repository"));
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_missing_config_suggests_init() {
    let repo = TempGitRepo::new();
    opp_in(&repo)
        .arg("push")
        .assert()
        .failure()
        .stderr(predicate::str::contains("opp init"));
}

#[test]
fn test_push_outside_pr_branch() {
    let repo = TempGitRepo::new();
    repo.save_config();
    opp_in(&repo)
        .arg("push")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not on a PR branch"));
}

#[test]
fn test_close_unknown_pr() {
    let repo = TempGitRepo::new();
    repo.save_config();
    opp_in(&repo)
        .args(["close", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pr/9"));
}

#[test]
fn test_empty_comment_is_rejected() {
    let repo = TempGitRepo::new();
    repo.save_config();
    opp_in(&repo)
        .args(["comment", "  ", "--pr", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("comment is empty"));
}

#[test]
fn test_not_a_pr_argument() {
    let repo = TempGitRepo::new();
    repo.save_config();
    opp_in(&repo)
        .args(["rebase", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a PR branch"));
}

#[test]
fn test_empty_tag_is_rejected() {
    let repo = TempGitRepo::new();
    repo.save_config();
    opp_in(&repo)
        .args(["branch", "tag", " "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tag is empty"));
}

#[test]
fn test_tag_base_branch() {
    let repo = TempGitRepo::new();
    repo.save_config();
    opp_in(&repo)
        .args(["b", "t", "JIRA-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tagged master with JIRA-1"));
}

#[tokio::test]
async fn test_checkout_pr_branch() {
    let repo = TempGitRepo::new();
    repo.save_config();
    repo.create_pr("HEAD^", 2).await;

    opp_in(&repo)
        .args(["checkout", "pr/2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pr/2"));
    assert_eq!(repo.git(&["branch", "--show-current"]), "pr/2");

    opp_in(&repo)
        .args(["co", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pr/9"));
    assert_eq!(repo.git(&["branch", "--show-current"]), "pr/2");
}

#[tokio::test]
async fn test_rebase_and_push_stack() {
    let repo = TempGitRepo::new();
    repo.save_config();
    repo.create_pr("HEAD^", 2).await;
    repo.create_pr("HEAD", 3).await;
    repo.git(&["checkout", "--quiet", "pr/2"]);
    repo.amend("3", "3 amended", "amended 3");

    opp_in(&repo)
        .args(["push", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("opp rebase"));

    opp_in(&repo)
        .args(["rebase", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebased"));
    assert_eq!(
        repo.messages("pr/3"),
        ["4", "amended 3", "2", "1", "0", "base"]
    );

    opp_in(&repo)
        .arg("push")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 PR(s) pushed"));
    assert_eq!(
        repo.remote_git(&["rev-parse", "tester/pr/3"]),
        repo.rev("pr/3").as_str()
    );
}

#[tokio::test]
async fn test_close_removes_pr() {
    let repo = TempGitRepo::new();
    repo.save_config();
    repo.create_pr("HEAD", 2).await;

    opp_in(&repo)
        .args(["close", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Closed"));

    assert!(!repo.local_has_branch("pr/2"));
    assert!(!repo.remote_has_branch("tester/pr/2"));
}
