//! Core types for opp

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every local PR branch
pub const PR_BRANCH_PREFIX: &str = "pr/";

/// A pull request number within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrNumber(pub u64);

impl PrNumber {
    /// Create a PR number, rejecting zero
    pub const fn new(n: u64) -> Option<Self> {
        if n == 0 { None } else { Some(Self(n)) }
    }

    /// The number following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A git commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(pub String);

impl Sha {
    /// Creates a new Sha from a string (not validated).
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Parse a strict PR branch name of the form `pr/<positive int>`.
///
/// Only the canonical spelling is accepted, so the result always maps back
/// to `name` through [`local_branch_for_pr`].
pub fn extract_pr_number(name: &str) -> Result<PrNumber> {
    name.strip_prefix(PR_BRANCH_PREFIX)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()) && !digits.starts_with('0'))
        .and_then(|n| n.parse::<u64>().ok())
        .and_then(PrNumber::new)
        .ok_or_else(|| Error::NotAPr(name.to_string()))
}

/// Parse a PR given on the command line: `pr/<n>` or a bare `<n>`.
pub fn parse_pr_argument(arg: &str) -> Result<PrNumber> {
    let trimmed = arg.trim().trim_start_matches('#');
    trimmed
        .parse::<u64>()
        .ok()
        .and_then(PrNumber::new)
        .map_or_else(|| extract_pr_number(trimmed), Ok)
}

/// Local branch name for a PR (`pr/<n>`)
pub fn local_branch_for_pr(pr: PrNumber) -> String {
    format!("{PR_BRANCH_PREFIX}{}", pr.0)
}

/// A branch that can be the ancestor of a PR
///
/// Either a plain branch such as `main`, or a PR branch identified by number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Branch {
    /// A non-PR branch (typically the base branch)
    Base(String),
    /// A PR branch
    Pr(PrNumber),
}

impl Branch {
    /// Decode a stored or user-supplied branch name
    pub fn parse(name: &str) -> Self {
        extract_pr_number(name).map_or_else(|_| Self::Base(name.to_string()), Self::Pr)
    }

    /// Name of the local branch
    pub fn local_name(&self) -> String {
        match self {
            Self::Base(name) => name.clone(),
            Self::Pr(pr) => local_branch_for_pr(*pr),
        }
    }

    /// Name of the branch on the remote
    ///
    /// PR branches are namespaced by the user's login so several people
    /// can stack PRs in one repository.
    pub fn remote_name(&self, login: &str) -> String {
        match self {
            Self::Base(name) => name.clone(),
            Self::Pr(_) if login.is_empty() => self.local_name(),
            Self::Pr(_) => format!("{login}/{}", self.local_name()),
        }
    }

    /// PR number, if this is a PR branch
    pub const fn pr_number(&self) -> Option<PrNumber> {
        match self {
            Self::Base(_) => None,
            Self::Pr(pr) => Some(*pr),
        }
    }

    /// Whether this is a PR branch
    pub const fn is_pr(&self) -> bool {
        matches!(self, Self::Pr(_))
    }
}

impl From<PrNumber> for Branch {
    fn from(pr: PrNumber) -> Self {
        Self::Pr(pr)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.local_name())
    }
}

/// A commit read from `git log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit SHA
    pub sha: Sha,
    /// When the commit was committed
    pub committed_at: DateTime<Utc>,
    /// Full commit message
    pub message: String,
}

impl CommitInfo {
    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Commit message without the summary line
    pub fn body(&self) -> &str {
        self.message
            .split_once('\n')
            .map_or("", |(_, rest)| rest.trim())
    }
}

/// A pull request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: PrNumber,
    /// Web URL for the PR
    pub html_url: String,
    /// Base branch name
    pub base_ref: String,
    /// Head branch name
    pub head_ref: String,
    /// PR title
    pub title: String,
    /// Whether PR is a draft
    pub is_draft: bool,
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom host (None for github.com)
    pub host: Option<String>,
}

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Extended PR details used by merge, status and clean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestDetails {
    /// PR number
    pub number: PrNumber,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
    /// Current state of the PR
    pub state: PrState,
    /// Whether PR is a draft
    pub is_draft: bool,
    /// Whether PR can be merged
    /// - `Some(true)` = mergeable
    /// - `Some(false)` = not mergeable (see `mergeable_state`)
    /// - `None` = unknown (GitHub still computing)
    pub mergeable: Option<bool>,
    /// GitHub's mergeable state (`clean`, `dirty`, `blocked`, ...)
    pub mergeable_state: Option<String>,
    /// Head branch name
    pub head_ref: String,
    /// Head commit SHA
    pub head_sha: String,
    /// Base branch name
    pub base_ref: String,
    /// Web URL for the PR
    pub html_url: String,
}

/// Result of a merge operation
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// Whether the merge was successful
    pub merged: bool,
    /// The SHA of the merge commit (if successful)
    pub sha: Option<String>,
    /// Message from the merge operation (especially on failure)
    pub message: Option<String>,
}

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Squash all commits into one
    Squash,
    /// Create a merge commit
    Merge,
    /// Rebase commits onto base branch
    #[default]
    Rebase,
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_pr_number_roundtrip() {
        for n in [1, 2, 42, 9999] {
            let pr = PrNumber(n);
            assert_eq!(extract_pr_number(&local_branch_for_pr(pr)).unwrap(), pr);
        }
    }

    #[test]
    fn test_extract_pr_number_rejects_other_names() {
        for name in ["main", "pr/", "pr/0", "pr/-3", "pr/abc", "feature/pr/2", "2", "pr/2/x"] {
            assert!(
                matches!(extract_pr_number(name), Err(Error::NotAPr(_))),
                "{name} should not be a PR branch"
            );
        }
    }

    #[test]
    fn test_extract_pr_number_rejects_non_canonical_digits() {
        for name in ["pr/05", "pr/+5", "pr/ 5", "pr/00"] {
            assert!(
                extract_pr_number(name).is_err(),
                "{name} is not how pr/5 is spelled"
            );
        }
        assert_eq!(Branch::parse("pr/05"), Branch::Base("pr/05".to_string()));
    }

    #[test]
    fn test_parse_pr_argument_accepts_bare_numbers() {
        assert_eq!(parse_pr_argument("12").unwrap(), PrNumber(12));
        assert_eq!(parse_pr_argument("#12").unwrap(), PrNumber(12));
        assert_eq!(parse_pr_argument("pr/12").unwrap(), PrNumber(12));
        assert!(parse_pr_argument("0").is_err());
        assert!(parse_pr_argument("main").is_err());
    }

    #[test]
    fn test_branch_parse() {
        assert_eq!(Branch::parse("pr/3"), Branch::Pr(PrNumber(3)));
        assert_eq!(Branch::parse("main"), Branch::Base("main".to_string()));
        assert_eq!(Branch::parse("pr/x"), Branch::Base("pr/x".to_string()));
    }

    #[test]
    fn test_branch_names() {
        let pr = Branch::Pr(PrNumber(5));
        assert_eq!(pr.local_name(), "pr/5");
        assert_eq!(pr.remote_name("octocat"), "octocat/pr/5");
        assert_eq!(pr.remote_name(""), "pr/5");

        let base = Branch::Base("main".to_string());
        assert_eq!(base.local_name(), "main");
        assert_eq!(base.remote_name("octocat"), "main");
        assert_eq!(base.pr_number(), None);
    }

    #[test]
    fn test_commit_info_summary_and_body() {
        let commit = CommitInfo {
            sha: Sha::from("abc1234def"),
            committed_at: Utc::now(),
            message: "Add parser\n\nHandles nested blocks.\n".to_string(),
        };
        assert_eq!(commit.summary(), "Add parser");
        assert_eq!(commit.body(), "Handles nested blocks.");
        assert_eq!(commit.sha.short(), "abc1234");
    }

    #[test]
    fn test_merge_method_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            method: MergeMethod,
        }
        let w: Wrapper = toml::from_str("method = \"squash\"").unwrap();
        assert_eq!(w.method, MergeMethod::Squash);
    }
}
