//! Pushing a PR chain

use crate::error::{Error, Result};
use crate::stack::{Stack, StackEvent};
use crate::types::{Branch, PrNumber, Sha};
use tracing::{info, instrument};

/// Push a PR and every PR it depends on, root first.
///
/// Nothing is pushed unless each PR contains its ancestor's tip. Pushed tips
/// are remembered so later rebases can find them. Returns the pushed PRs in
/// push order.
#[instrument(skip(stack))]
pub async fn push_stack(stack: &Stack, pr: PrNumber) -> Result<Vec<PrNumber>> {
    let mut chain = stack.all_ancestors(pr).await?;
    chain.push(pr);

    for pair in chain.windows(2) {
        let [ancestor, descendant] = [pair[0], pair[1]];
        let ancestor_tip = stack.require_local_tip(&Branch::Pr(ancestor)).await?;
        let descendant_tip = stack.require_local_tip(&Branch::Pr(descendant)).await?;
        if !stack
            .git()
            .is_ancestor(ancestor_tip.as_str(), descendant_tip.as_str())
            .await?
        {
            return Err(Error::NeedsRebase {
                pr: descendant,
                ancestor,
            });
        }
    }

    for &pr in &chain {
        let branch = Branch::Pr(pr);
        let tip = stack.require_local_tip(&branch).await?;
        let previous = stack.remote_tip(&branch).await?;
        stack
            .git()
            .push_force(&tip, &stack.remote_name(&branch))
            .await?;
        stack.remember_current_tip(pr).await?;
        info!(%pr, previous = ?previous.as_ref().map(Sha::short), tip = tip.short(), "pushed");
        stack.emit(StackEvent::Pushed { pr, previous, tip }).await;
    }
    Ok(chain)
}
