//! Shared fixtures for integration tests

#![allow(dead_code)]

mod mock_platform;

pub use mock_platform::*;

use async_trait::async_trait;
use opp::config::{Config, GitHubConfig, RepoConfig};
use opp::git::GitRepo;
use opp::stack::{ProgressCallback, Stack, StackEvent};
use opp::submit::{CreateOptions, create_pull_request};
use opp::types::{Branch, PlatformConfig, PrNumber, Sha};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Environment every git process in a test runs with
pub const GIT_ENV: &[(&str, &str)] = &[
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_AUTHOR_NAME", "Tester"),
    ("GIT_AUTHOR_EMAIL", "tester@example.com"),
    ("GIT_COMMITTER_NAME", "Tester"),
    ("GIT_COMMITTER_EMAIL", "tester@example.com"),
    ("GIT_SEQUENCE_EDITOR", "true"),
    ("GIT_EDITOR", "true"),
];

/// Records every progress event a stack operation emits
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<StackEvent>>,
    messages: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<StackEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
        self.messages.lock().unwrap().clear();
    }

    /// PRs in the order they were rebased onto something
    pub fn rebase_order(&self) -> Vec<PrNumber> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StackEvent::RebaseStarted { pr, .. } => Some(pr),
                _ => None,
            })
            .collect()
    }

    /// PRs that were removed
    pub fn removed(&self) -> Vec<PrNumber> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StackEvent::Removing { pr, .. } => Some(pr),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_event(&self, event: &StackEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// A clone of a bare "GitHub" remote with a base commit on `master`
/// followed by local commits "0" to "4", each adding its own file.
pub struct TempGitRepo {
    dir: TempDir,
    remote: PathBuf,
    root: PathBuf,
    pub stack: Arc<Stack>,
    pub progress: Arc<RecordingProgress>,
    pub mock: Arc<MockPlatformService>,
}

impl TempGitRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let remote = dir.path().join("remote.git");
        let root = dir.path().join("work");
        std::fs::create_dir_all(&remote).expect("create remote dir");
        std::fs::create_dir_all(&root).expect("create work dir");

        run_git(&remote, &["init", "--quiet", "--bare", "-b", "master"]);
        run_git(&root, &["init", "--quiet", "-b", "master"]);
        run_git(
            &root,
            &["remote", "add", "origin", remote.to_str().expect("utf-8 path")],
        );
        std::fs::create_dir_all(root.join(".git/info")).expect("create info dir");
        std::fs::write(root.join(".git/info/exclude"), "/.opp/\n").expect("write exclude");

        write_file(&root, "base", "base");
        run_git(&root, &["add", "."]);
        run_git(&root, &["commit", "--quiet", "-m", "base"]);
        run_git(&root, &["push", "--quiet", "origin", "master"]);
        run_git(&root, &["fetch", "--quiet", "origin"]);
        run_git(
            &root,
            &[
                "symbolic-ref",
                "refs/remotes/origin/HEAD",
                "refs/remotes/origin/master",
            ],
        );

        for i in 0..5 {
            let name = i.to_string();
            write_file(&root, &name, &name);
            run_git(&root, &["add", "."]);
            run_git(&root, &["commit", "--quiet", "-m", &name]);
        }

        let config = test_config();
        let mut git = GitRepo::new(root.clone(), "origin", Duration::from_secs(30));
        for (key, value) in GIT_ENV {
            git = git.with_env(*key, *value);
        }
        let progress = Arc::new(RecordingProgress::default());
        let stack = Stack::new(git, config).with_progress(progress.clone());

        Self {
            dir,
            remote,
            root,
            stack: Arc::new(stack),
            progress,
            mock: Arc::new(MockPlatformService::with_config(github_config())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `.opp/config.toml` as `opp init` would
    pub fn save_config(&self) {
        test_config().save(&self.root).expect("save config");
    }

    /// Run git in the working tree and return its trimmed stdout
    pub fn git(&self, args: &[&str]) -> String {
        run_git(&self.root, args)
    }

    /// Run git in the bare remote
    pub fn remote_git(&self, args: &[&str]) -> String {
        run_git(&self.remote, args)
    }

    pub fn rev(&self, rev: &str) -> Sha {
        Sha::new(self.git(&["rev-parse", rev]))
    }

    /// Whether the remote has a branch
    pub fn remote_has_branch(&self, name: &str) -> bool {
        let out = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("refs/heads/{name}"))
            .current_dir(&self.remote)
            .envs(GIT_ENV.iter().copied())
            .output()
            .expect("spawn git");
        out.status.success()
    }

    pub fn local_has_branch(&self, name: &str) -> bool {
        let out = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("refs/heads/{name}"))
            .current_dir(&self.root)
            .envs(GIT_ENV.iter().copied())
            .output()
            .expect("spawn git");
        out.status.success()
    }

    /// Commit a file with the given content
    pub fn commit(&self, file: &str, content: &str, message: &str) {
        write_file(&self.root, file, content);
        self.git(&["add", "."]);
        self.git(&["commit", "--quiet", "-m", message]);
    }

    /// Amend HEAD with a file change and a new message
    pub fn amend(&self, file: &str, content: &str, message: &str) {
        write_file(&self.root, file, content);
        self.git(&["add", "."]);
        self.git(&["commit", "--quiet", "--amend", "-m", message]);
    }

    /// Subjects of the commits on a branch, newest first, down to the root
    pub fn messages(&self, rev: &str) -> Vec<String> {
        self.git(&["log", "--format=%s", rev])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Open a PR for `rev` that GitHub will number `n`
    pub async fn create_pr(&self, rev: &str, n: u64) -> PrNumber {
        self.mock.set_last_issue(n - 1);
        let options = CreateOptions {
            revision: Some(rev.to_string()),
            ..CreateOptions::default()
        };
        let created = create_pull_request(&self.stack, self.mock.as_ref(), &options)
            .await
            .expect("create PR");
        assert_eq!(created.pr.number, PrNumber(n));
        created.pr.number
    }

    /// Make the remote base branch point at the PR's local tip, as a
    /// fast-forward merge on GitHub would.
    pub async fn merge_remotely(&self, pr: PrNumber) {
        let branch = Branch::Pr(pr).local_name();
        self.git(&["push", "--quiet", "--force", "origin", &format!("{branch}:master")]);
        self.stack.git().fetch().await.expect("fetch");
    }
}

fn run_git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .envs(GIT_ENV.iter().copied())
        .output()
        .expect("spawn git");
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn write_file(root: &Path, name: &str, content: &str) {
    std::fs::write(root.join(name), format!("{content}\n")).expect("write file");
}

pub fn test_config() -> Config {
    Config {
        github: GitHubConfig {
            login: "tester".to_string(),
            ..GitHubConfig::default()
        },
        repo: RepoConfig {
            github: "test/repo".to_string(),
            remote: "origin".to_string(),
            branch: "master".to_string(),
        },
    }
}

pub fn github_config() -> PlatformConfig {
    PlatformConfig {
        owner: "test".to_string(),
        repo: "repo".to_string(),
        host: None,
    }
}
