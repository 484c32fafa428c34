//! Cleanup cascade
//!
//! Removes PRs whose work has landed (or been abandoned): dependents are
//! reparented onto the base branch first, inheriting the removed PR's tips,
//! then the PR's local branch, remote branch and state are deleted.

use super::{Stack, StackEvent};
use crate::error::Result;
use crate::types::{Branch, PrNumber};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

impl Stack {
    /// Clean up one PR, reparenting every local PR that depended on it.
    pub async fn cleanup_after_merge(&self, pr: PrNumber) -> Result<()> {
        let all_known = self.store.all_local_pr_numbers()?;
        self.cleanup_multiple(&[pr], &all_known).await
    }

    /// Remove `to_clean`, reparenting their dependents among `all_known`.
    ///
    /// Running it again on PRs that are already gone does nothing.
    #[instrument(skip(self, all_known))]
    pub async fn cleanup_multiple(&self, to_clean: &[PrNumber], all_known: &[PrNumber]) -> Result<()> {
        let _guard = self.cascade_lock.lock().await;
        let base = self.base_branch();
        let cleaning: HashSet<PrNumber> = to_clean.iter().copied().collect();

        for &dependent in all_known.iter().filter(|pr| !cleaning.contains(pr)) {
            let Some(mut state) = self.store.load_state(&Branch::Pr(dependent))? else {
                continue;
            };
            let Some(Branch::Pr(previous)) = state.ancestor else {
                continue;
            };
            if !cleaning.contains(&previous) {
                continue;
            }

            let removed_tips = self
                .store
                .load_state(&Branch::Pr(previous))?
                .map(|s| s.known_tips)
                .unwrap_or_default();
            state.set_ancestor(base.clone());
            state.inherit_ancestor_tips(&removed_tips);
            self.save_pr_state(dependent, &state)?;

            info!(%dependent, %previous, onto = %base, "reparented dependent PR");
            self.emit(StackEvent::Reparented {
                pr: dependent,
                previous,
                onto: base.clone(),
            })
            .await;

            let local = Branch::Pr(dependent).local_name();
            if let Err(e) = self.git.set_upstream(&local, &self.remote_name(&base)).await {
                warn!(%dependent, error = %e, "could not update upstream");
            }
        }

        if let Some(current) = self.current_pr().await?
            && cleaning.contains(&current)
        {
            debug!(%current, "moving off a branch being removed");
            self.checkout(&base).await?;
        }

        for &pr in to_clean {
            let branch = Branch::Pr(pr);
            let tip = self.local_tip(&branch).await?;
            let remote_tip = self.remote_tip(&branch).await?;
            if tip.is_none() && remote_tip.is_none() && !self.store.has_state(&branch) {
                continue;
            }

            info!(%pr, tip = ?tip.as_ref().map(|t| t.short().to_string()), "removing PR");
            self.emit(StackEvent::Removing {
                pr,
                tip: tip.clone(),
            })
            .await;

            if tip.is_some() {
                self.git.delete_local_branch(&branch.local_name()).await?;
            }
            if remote_tip.is_some()
                && let Err(e) = self
                    .git
                    .delete_remote_branch(&self.remote_name(&branch))
                    .await
            {
                warn!(%pr, error = %e, "could not delete remote branch");
                self.emit(StackEvent::RemoteDeleteFailed {
                    pr,
                    reason: e.to_string(),
                })
                .await;
            }
            self.store.delete_state(&branch)?;
        }

        Ok(())
    }

    /// PRs with state and a live local branch; the rest are cleaned up.
    pub async fn all_prs(&self) -> Result<Vec<PrNumber>> {
        let known = self.store.all_local_pr_numbers()?;
        let mut live = Vec::with_capacity(known.len());
        let mut gone = Vec::new();
        for pr in &known {
            if self.local_tip(&Branch::Pr(*pr)).await?.is_some() {
                live.push(*pr);
            } else {
                gone.push(*pr);
            }
        }

        if !gone.is_empty() {
            info!(?gone, "local branches deleted, cleaning up");
            self.cleanup_multiple(&gone, &known).await?;
        }
        Ok(live)
    }
}
