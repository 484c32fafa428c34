//! Rebase cascade
//!
//! Rebasing a PR first rebases every PR it depends on, root first. Each PR is
//! replayed from its fork point (the newest commit in its history that its
//! ancestor is known to have had as a tip) onto the ancestor's current tip.
//! A PR that ends up contained in the remote base branch has been merged and
//! is cleaned up; its dependents are then rebased onto the base branch.

use super::{MAX_STACK_DEPTH, Stack, StackEvent};
use crate::error::{Error, Result};
use crate::types::{Branch, PrNumber, Sha};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, instrument};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What happened to a PR during a rebase cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// The PR was rebased onto its ancestor
    Rebased,
    /// The PR turned out to be merged (or its branch was gone) and was cleaned up
    Merged,
}

impl Stack {
    /// Rebase a PR and everything it depends on.
    ///
    /// When the PR itself turns out to be merged, the base branch is checked
    /// out afterwards.
    #[instrument(skip(self))]
    pub async fn rebase_stack(&self, pr: PrNumber) -> Result<RebaseOutcome> {
        if self.git.rebase_in_progress().await? {
            return Err(Error::RebaseInProgress);
        }
        let ancestors = self.all_ancestors(pr).await?;
        debug!(?ancestors, "rebasing stack");

        let outcome = self.rebase_pr(pr, 0).await?;
        if outcome == RebaseOutcome::Merged {
            info!(%pr, "PR was merged, switching to base branch");
            self.checkout(&self.base_branch()).await?;
        }
        Ok(outcome)
    }

    fn rebase_pr(&self, pr: PrNumber, depth: usize) -> BoxFuture<'_, Result<RebaseOutcome>> {
        Box::pin(async move {
            if depth > MAX_STACK_DEPTH {
                return Err(Error::StructuralInconsistency(format!(
                    "rebase of {pr} recursed more than {MAX_STACK_DEPTH} levels"
                )));
            }

            let branch = Branch::Pr(pr);
            if self.local_tip(&branch).await?.is_none() {
                info!(%pr, "local branch is gone, cleaning up");
                self.cleanup_after_merge(pr).await?;
                return Ok(RebaseOutcome::Merged);
            }

            let ancestor = self.get_ancestor(pr).await?;
            let fork_point = self.first_ancestor_commit(pr, &ancestor).await?;

            let ancestor = match ancestor {
                Branch::Pr(parent) => match self.rebase_pr(parent, depth + 1).await? {
                    RebaseOutcome::Rebased => Branch::Pr(parent),
                    // the parent's cleanup reparented this PR
                    RebaseOutcome::Merged => self.get_ancestor(pr).await?,
                },
                base @ Branch::Base(_) => base,
            };

            self.rebase_onto(pr, &ancestor, &fork_point).await
        })
    }

    async fn rebase_onto(
        &self,
        pr: PrNumber,
        ancestor: &Branch,
        fork_point: &Sha,
    ) -> Result<RebaseOutcome> {
        let branch = Branch::Pr(pr);
        let target = self.rebase_target(ancestor);

        self.emit(StackEvent::RebaseStarted {
            pr,
            onto: ancestor.clone(),
        })
        .await;
        info!(%pr, onto = %target, fork_point = fork_point.short(), "rebasing");

        self.git.checkout(&branch.local_name()).await?;
        if !self
            .git
            .rebase_onto_silently(&target, fork_point.as_str())
            .await?
        {
            self.emit(StackEvent::RebaseConflict {
                pr,
                onto: ancestor.clone(),
            })
            .await;
            if !self.git.rebase_interactive(&target).await? {
                return Err(Error::RebaseUnfinished {
                    branch: branch.local_name(),
                });
            }
        }

        let tip = self.require_local_tip(&branch).await?;
        if !ancestor.is_pr()
            && let Some(base_tip) = self.remote_tip(ancestor).await?
            && self.git.is_ancestor(tip.as_str(), base_tip.as_str()).await?
        {
            self.emit(StackEvent::DetectedMerged { pr }).await;
            self.cleanup_after_merge(pr).await?;
            return Ok(RebaseOutcome::Merged);
        }

        self.remember_current_tip(pr).await?;
        self.emit(StackEvent::Rebased { pr, tip }).await;
        Ok(RebaseOutcome::Rebased)
    }

    /// The newest commit in the PR's history that belongs to its ancestor.
    ///
    /// Looks for any tip the ancestor is known to have had, including its
    /// current remote tip. Falls back to the ancestor's remote tip, then its
    /// local tip, then the merge base.
    pub async fn first_ancestor_commit(&self, pr: PrNumber, ancestor: &Branch) -> Result<Sha> {
        let tip = self.require_local_tip(&Branch::Pr(pr)).await?;
        let commits = self.commits_not_in_base(&tip).await?;

        let mut known = self.ancestor_tips(pr)?;
        let remote_tip = self.remote_tip(ancestor).await?;
        if let Some(remote_tip) = &remote_tip {
            known.push(remote_tip.clone());
        }

        if let Some(commit) = commits.iter().find(|c| known.contains(&c.sha)) {
            debug!(%pr, fork_point = commit.sha.short(), "found known ancestor tip");
            return Ok(commit.sha.clone());
        }
        if let Some(remote_tip) = remote_tip {
            return Ok(remote_tip);
        }
        if let Some(local_tip) = self.local_tip(ancestor).await? {
            return Ok(local_tip);
        }

        let target = self.rebase_target(ancestor);
        self.git
            .merge_base(tip.as_str(), &target)
            .await?
            .ok_or_else(|| Error::DisjointHistory {
                head: tip.to_string(),
                base: target,
            })
    }
}
