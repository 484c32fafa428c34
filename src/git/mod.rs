//! Typed port over the `git` command line
//!
//! Every operation opp needs from version control goes through [`GitRepo`].
//! Commands are spawned with argument vectors, never through a shell, and
//! calls that reach the remote run under the configured network timeout.

mod rebase;

use crate::error::{Error, Result};
use crate::types::{CommitInfo, Sha};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// A git working tree driven through the git CLI
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
    remote: String,
    network_timeout: Duration,
    extra_env: Vec<(String, String)>,
}

impl GitRepo {
    /// Create a port for the working tree at `root`, talking to `remote`.
    pub fn new(root: impl Into<PathBuf>, remote: impl Into<String>, network_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            remote: remote.into(),
            network_timeout,
            extra_env: Vec::new(),
        }
    }

    /// Set an environment variable for every git process spawned.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    /// Find the top-level directory of the working tree containing `path`.
    pub async fn discover(path: &Path) -> Result<PathBuf> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::Git {
                command: "rev-parse --show-toplevel".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(PathBuf::from(String::from_utf8_lossy(&output.stdout).trim()))
    }

    /// Root of the working tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the remote
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// `<remote>/<branch>`, as accepted by rebase and upstream tracking
    pub fn remote_ref(&self, branch: &str) -> String {
        format!("{}/{branch}", self.remote)
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.root)
            .envs(self.extra_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);
        cmd
    }

    /// Run git and return its output whatever the exit status.
    async fn run_unchecked(&self, args: &[&str]) -> Result<Output> {
        debug!(command = %args.join(" "), "running git");
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        Ok(output)
    }

    /// Run git and return trimmed stdout, failing on a non-zero exit.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.run_unchecked(args).await?;
        check_output(args, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Like [`Self::run`], under the network timeout.
    async fn run_network(&self, args: &[&str]) -> Result<String> {
        let what = format!("git {}", args.first().copied().unwrap_or_default());
        tokio::time::timeout(self.network_timeout, self.run(args))
            .await
            .map_err(|_| Error::Timeout(what))?
    }

    /// Run git attached to the user's terminal; returns whether it succeeded.
    async fn run_interactive(&self, args: &[&str]) -> Result<bool> {
        debug!(command = %args.join(" "), "running interactive git");
        let status = self.command(args).status().await?;
        Ok(status.success())
    }

    /// Path of a file inside the git directory, such as `info/exclude`
    pub async fn git_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.run(&["rev-parse", "--git-path", name]).await?;
        Ok(self.root.join(path.trim()))
    }

    // =========================================================================
    // Refs
    // =========================================================================

    /// Resolve a reference to a commit, `None` if it does not exist.
    pub async fn resolve_ref(&self, reference: &str) -> Result<Option<Sha>> {
        let spec = format!("{reference}^{{commit}}");
        let output = self
            .run_unchecked(&["rev-parse", "--verify", "--quiet", &spec])
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!sha.is_empty()).then(|| Sha::new(sha)))
    }

    /// Resolve a revision that must exist.
    pub async fn rev_parse(&self, rev: &str) -> Result<Sha> {
        self.resolve_ref(rev)
            .await?
            .ok_or_else(|| Error::InvalidArgument(format!("unknown revision '{rev}'")))
    }

    /// Tip of a local branch
    pub async fn local_branch_tip(&self, branch: &str) -> Result<Option<Sha>> {
        self.resolve_ref(&format!("refs/heads/{branch}")).await
    }

    /// Tip of a remote-tracking branch, as of the last fetch
    pub async fn remote_branch_tip(&self, branch: &str) -> Result<Option<Sha>> {
        self.resolve_ref(&format!("refs/remotes/{}/{branch}", self.remote))
            .await
    }

    /// Commit HEAD points at
    pub async fn head(&self) -> Result<Sha> {
        self.rev_parse("HEAD").await
    }

    /// Branch HEAD is on, `None` when detached.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let output = self
            .run_unchecked(&["symbolic-ref", "--quiet", "--short", "HEAD"])
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    /// Local branches under `refs/heads/<prefix>` with their tips
    pub async fn list_branches(&self, prefix: &str) -> Result<Vec<(String, Sha)>> {
        let pattern = format!("refs/heads/{}", prefix.trim_end_matches('/'));
        let out = self
            .run(&["for-each-ref", "--format=%(refname) %(objectname)", &pattern])
            .await?;
        Ok(out
            .lines()
            .filter_map(|line| {
                let (name, sha) = line.split_once(' ')?;
                let name = name.strip_prefix("refs/heads/")?;
                Some((name.to_string(), Sha::new(sha)))
            })
            .collect())
    }

    // =========================================================================
    // Branch manipulation
    // =========================================================================

    /// Check out a branch or revision
    pub async fn checkout(&self, rev: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", rev]).await.map(drop)
    }

    /// Detach HEAD at a revision
    pub async fn detach(&self, rev: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", "--detach", rev])
            .await
            .map(drop)
    }

    /// Create a local branch at a commit
    pub async fn create_branch(&self, name: &str, sha: &Sha) -> Result<()> {
        self.run(&["branch", name, sha.as_str()]).await.map(drop)
    }

    /// Delete a local branch, even if unmerged
    pub async fn delete_local_branch(&self, name: &str) -> Result<()> {
        self.run(&["branch", "--quiet", "-D", name]).await.map(drop)
    }

    /// Point a local branch's upstream at `<remote>/<remote_branch>`
    pub async fn set_upstream(&self, local: &str, remote_branch: &str) -> Result<()> {
        let upstream = format!("--set-upstream-to={}", self.remote_ref(remote_branch));
        self.run(&["branch", "--quiet", &upstream, local])
            .await
            .map(drop)
    }

    // =========================================================================
    // Remote
    // =========================================================================

    /// Fetch the remote, pruning deleted branches
    pub async fn fetch(&self) -> Result<()> {
        let remote = self.remote.clone();
        self.run_network(&["fetch", "--prune", "--quiet", &remote])
            .await
            .map(drop)
    }

    /// Force-push a commit to a branch on the remote
    pub async fn push_force(&self, sha: &Sha, remote_branch: &str) -> Result<()> {
        let refspec = format!("{sha}:refs/heads/{remote_branch}");
        let remote = self.remote.clone();
        self.run_network(&["push", "--force", "--quiet", &remote, &refspec])
            .await
            .map(drop)
    }

    /// Delete a branch on the remote
    pub async fn delete_remote_branch(&self, remote_branch: &str) -> Result<()> {
        let remote = self.remote.clone();
        self.run_network(&["push", "--quiet", &remote, "--delete", remote_branch])
            .await
            .map(drop)
    }

    /// Names of all configured remotes
    pub async fn remotes(&self) -> Result<Vec<String>> {
        let out = self.run(&["remote"]).await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// URL of the remote
    pub async fn remote_url(&self) -> Result<String> {
        let remote = self.remote.clone();
        self.run(&["remote", "get-url", &remote]).await
    }

    /// Branch the remote's HEAD points at, if known locally
    pub async fn remote_default_branch(&self) -> Result<Option<String>> {
        let head = format!("refs/remotes/{}/HEAD", self.remote);
        let output = self
            .run_unchecked(&["symbolic-ref", "--quiet", &head])
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        let target = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let prefix = format!("refs/remotes/{}/", self.remote);
        Ok(target.strip_prefix(&prefix).map(str::to_string))
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Best common ancestor of two commits, `None` for disjoint histories
    pub async fn merge_base(&self, a: &str, b: &str) -> Result<Option<Sha>> {
        let args = ["merge-base", a, b];
        let output = self.run_unchecked(&args).await?;
        match output.status.code() {
            Some(0) => Ok(Some(Sha::new(
                String::from_utf8_lossy(&output.stdout).trim(),
            ))),
            Some(1) => Ok(None),
            _ => check_output(&args, &output).map(|()| None),
        }
    }

    /// Whether `ancestor` is reachable from `descendant`
    pub async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let args = ["merge-base", "--is-ancestor", ancestor, descendant];
        let output = self.run_unchecked(&args).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => check_output(&args, &output).map(|()| false),
        }
    }

    /// Commits reachable from `head` but not from `exclude`, child first.
    pub async fn commits_between(&self, exclude: &str, head: &str) -> Result<Vec<CommitInfo>> {
        let range = format!("{exclude}..{head}");
        let format = "--format=%H%x1f%ct%x1f%B%x1e";
        let out = self.run(&["log", "--topo-order", format, &range]).await?;
        Ok(parse_log(&out))
    }

    /// Whether tracked files have uncommitted changes
    pub async fn has_local_changes(&self) -> Result<bool> {
        let out = self
            .run(&["status", "--porcelain", "--untracked-files=no"])
            .await?;
        Ok(!out.trim().is_empty())
    }
}

fn check_output(args: &[&str], output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(Error::Git {
        command: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn parse_log(out: &str) -> Vec<CommitInfo> {
    out.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            let mut fields = record.splitn(3, FIELD_SEP);
            let sha = fields.next()?.trim();
            if sha.is_empty() {
                return None;
            }
            let timestamp = fields.next()?.trim().parse::<i64>().ok()?;
            let message = fields.next().unwrap_or_default().trim_end().to_string();
            Some(CommitInfo {
                sha: Sha::new(sha),
                committed_at: DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default(),
                message,
            })
        })
        .collect()
}
