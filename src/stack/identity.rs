//! Ancestor resolution
//!
//! A PR's stored ancestor may name a PR whose branch has since been deleted
//! (merged, closed, or removed by hand). Resolution walks past such PRs to
//! the first live ancestor, rewrites the stored pointer, inherits the
//! vanished PRs' tips, and cleans them up.

use super::{Stack, StackEvent};
use crate::error::{Error, Result};
use crate::state::BranchState;
use crate::types::{Branch, PrNumber, Sha};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Longest ancestor chain followed before the state is declared corrupt
pub const MAX_STACK_DEPTH: usize = 256;

impl Stack {
    /// State of a PR, created empty if absent
    pub fn pr_state(&self, pr: PrNumber) -> Result<BranchState> {
        self.store.get_state(&Branch::Pr(pr))
    }

    /// Persist the state of a PR
    pub fn save_pr_state(&self, pr: PrNumber, state: &BranchState) -> Result<()> {
        self.store.save_state(&Branch::Pr(pr), state)
    }

    /// Point a PR at a new ancestor
    pub fn set_ancestor(&self, pr: PrNumber, ancestor: Branch) -> Result<()> {
        let mut state = self.pr_state(pr)?;
        state.set_ancestor(ancestor);
        self.save_pr_state(pr, &state)
    }

    /// Append the PR's current local tip to its known tips.
    pub async fn remember_current_tip(&self, pr: PrNumber) -> Result<Sha> {
        let tip = self.require_local_tip(&Branch::Pr(pr)).await?;
        let mut state = self.pr_state(pr)?;
        if state.remember_tip(tip.clone()) {
            self.save_pr_state(pr, &state)?;
        }
        Ok(tip)
    }

    /// Resolve the branch a PR is stacked on.
    ///
    /// Unset ancestors resolve to the base branch. If the stored ancestor is a
    /// PR whose local branch is gone, its own ancestors are followed to the
    /// first PR that still exists (or the branch at the end of the chain);
    /// that becomes this PR's ancestor and the vanished PRs are cleaned up.
    #[instrument(skip(self))]
    pub async fn get_ancestor(&self, pr: PrNumber) -> Result<Branch> {
        let mut state = self.pr_state(pr)?;
        let Some(stored) = state.ancestor.clone() else {
            debug!("no ancestor set, using base branch");
            return Ok(self.base_branch());
        };
        let Branch::Pr(mut candidate) = stored else {
            return Ok(stored);
        };

        let mut visited = HashSet::from([pr]);
        let mut defunct = Vec::new();
        let resolved = loop {
            if !visited.insert(candidate) {
                return Err(Error::StructuralInconsistency(format!(
                    "ancestors of {pr} loop back to {candidate}"
                )));
            }
            if self.local_tip(&Branch::Pr(candidate)).await?.is_some() {
                break Branch::Pr(candidate);
            }
            let removed = self
                .store
                .load_state(&Branch::Pr(candidate))?
                .unwrap_or_default();
            state.inherit_ancestor_tips(&removed.known_tips);
            defunct.push(candidate);
            match removed.ancestor {
                Some(Branch::Pr(next)) => candidate = next,
                Some(base @ Branch::Base(_)) => break base,
                None => break self.base_branch(),
            }
        };

        if defunct.is_empty() {
            return Ok(resolved);
        }

        info!(ancestor = %resolved, removed = ?defunct, "ancestor no longer exists, reparenting");
        state.set_ancestor(resolved.clone());
        self.save_pr_state(pr, &state)?;
        self.emit(StackEvent::Reparented {
            pr,
            previous: defunct[0],
            onto: resolved.clone(),
        })
        .await;

        let all_known = self.store.all_local_pr_numbers()?;
        self.cleanup_multiple(&defunct, &all_known).await?;
        Ok(resolved)
    }

    /// Every PR the given one depends on, root first, excluding itself.
    pub async fn all_ancestors(&self, pr: PrNumber) -> Result<Vec<PrNumber>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([pr]);
        let mut current = pr;

        while let Branch::Pr(ancestor) = self.get_ancestor(current).await? {
            if !visited.insert(ancestor) {
                return Err(Error::StructuralInconsistency(format!(
                    "{pr} has a cyclic ancestor chain through {ancestor}"
                )));
            }
            if chain.len() >= MAX_STACK_DEPTH {
                return Err(Error::StructuralInconsistency(format!(
                    "{pr} has more than {MAX_STACK_DEPTH} ancestors"
                )));
            }
            chain.push(ancestor);
            current = ancestor;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Tips that identify the ancestor in a PR's history
    ///
    /// The stored ancestor's own known tips come first, followed by the tips
    /// this PR inherited from ancestors that have since vanished.
    pub fn ancestor_tips(&self, pr: PrNumber) -> Result<Vec<Sha>> {
        let state = self.pr_state(pr)?;
        let mut tips = match &state.ancestor {
            Some(Branch::Pr(ancestor)) => self
                .store
                .load_state(&Branch::Pr(*ancestor))?
                .map(|s| s.known_tips)
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        tips.extend(state.ancestor_known_tips);
        Ok(tips)
    }
}
