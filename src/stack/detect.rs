//! Branching-point detection
//!
//! Given a revision, find which existing PR (if any) it is stacked on and
//! which commits are new relative to it.

use super::Stack;
use crate::error::{Error, Result};
use crate::types::{Branch, CommitInfo, PR_BRANCH_PREFIX, PrNumber, Sha, extract_pr_number};
use std::collections::HashMap;
use tracing::debug;

/// Where a revision leaves the existing stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchingPoint {
    /// Branch the revision is stacked on
    pub ancestor: Branch,
    /// Commits not part of the ancestor, child first
    pub new_commits: Vec<CommitInfo>,
}

impl BranchingPoint {
    /// Whether the revision is exactly the tip of an existing PR
    pub const fn is_existing_pr_tip(&self) -> bool {
        self.ancestor.is_pr() && self.new_commits.is_empty()
    }

    /// Oldest new commit
    pub fn first_new_commit(&self) -> Option<&CommitInfo> {
        self.new_commits.last()
    }
}

impl Stack {
    /// Commits reachable from `head` but not from the remote base branch.
    ///
    /// Fails with [`Error::DisjointHistory`] if `head` shares no history with it.
    pub async fn commits_not_in_base(&self, head: &Sha) -> Result<Vec<CommitInfo>> {
        let base = self.rebase_target(&self.base_branch());
        let merge_base = self
            .git
            .merge_base(head.as_str(), &base)
            .await?
            .ok_or_else(|| Error::DisjointHistory {
                head: head.to_string(),
                base: base.clone(),
            })?;
        self.git.commits_between(merge_base.as_str(), head.as_str()).await
    }

    /// Find the PR `head` is stacked on and the commits new since it.
    pub async fn find_branching_point(&self, head: &Sha) -> Result<BranchingPoint> {
        let commits = self.commits_not_in_base(head).await?;
        let tracked = self.tracked_tips().await?;

        for (i, commit) in commits.iter().enumerate() {
            if let Some(&pr) = tracked.get(&commit.sha) {
                debug!(%pr, new = i, "revision stacked on existing PR");
                return Ok(BranchingPoint {
                    ancestor: Branch::Pr(pr),
                    new_commits: commits[..i].to_vec(),
                });
            }
        }

        Ok(BranchingPoint {
            ancestor: self.base_branch(),
            new_commits: commits,
        })
    }

    /// Local PR branch tips; a tip shared by several PRs maps to the lowest.
    async fn tracked_tips(&self) -> Result<HashMap<Sha, PrNumber>> {
        let mut tips: HashMap<Sha, PrNumber> = HashMap::new();
        for (name, sha) in self.git.list_branches(PR_BRANCH_PREFIX).await? {
            let Ok(pr) = extract_pr_number(&name) else {
                continue;
            };
            tips.entry(sha)
                .and_modify(|existing| *existing = (*existing).min(pr))
                .or_insert(pr);
        }
        Ok(tips)
    }
}
