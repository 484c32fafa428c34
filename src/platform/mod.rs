//! Platform services for GitHub
//!
//! The stack engine only needs a handful of PR operations; they live behind
//! [`PlatformService`] so tests can substitute a mock.

mod detection;
mod factory;
mod github;

pub use detection::parse_repo_info;
pub use factory::create_platform_service;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{
    MergeMethod, MergeResult, PlatformConfig, PrNumber, PullRequest, PullRequestDetails, Sha,
};
use async_trait::async_trait;

/// Platform service trait for PR operations
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Open a PR from `head` into `base`.
    async fn create_pr_with_options(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: Option<&str>,
        draft: bool,
    ) -> Result<PullRequest>;

    /// Number of the most recently created issue or PR, if any
    ///
    /// Issues and PRs share one number sequence, so the next PR is predicted
    /// to get this number plus one.
    async fn last_issue_number(&self) -> Result<Option<PrNumber>>;

    /// Login of the authenticated user
    async fn current_login(&self) -> Result<String>;

    /// Create a comment on a PR
    async fn create_pr_comment(&self, pr: PrNumber, body: &str) -> Result<()>;

    /// Get full PR details including state and mergeability
    async fn get_pr_details(&self, pr: PrNumber) -> Result<PullRequestDetails>;

    /// Whether CI for a ref has passed (or none is configured)
    async fn checks_passing(&self, git_ref: &str) -> Result<bool>;

    /// Merge a PR, provided its head is still `head_sha`
    async fn merge_pr(
        &self,
        pr: PrNumber,
        head_sha: &Sha,
        method: MergeMethod,
    ) -> Result<MergeResult>;

    /// Get the platform configuration
    fn config(&self) -> &PlatformConfig;
}
