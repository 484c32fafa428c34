//! Close command - abandon a PR

use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize};
use anstream::println;
use opp::error::{Error, Result};
use opp::types::Branch;
use std::path::Path;

/// Run the close command
///
/// Deleting the PR's remote branch makes GitHub close the PR.
pub async fn run_close(root: &Path, pr: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new(root)?;
    let pr = ctx.stack.resolve_pr(pr).await?;
    let branch = Branch::Pr(pr);
    if ctx.stack.local_tip(&branch).await?.is_none() && !ctx.stack.store().has_state(&branch) {
        return Err(Error::BranchNotFound(branch.local_name()));
    }

    println!("{} {}...", "Closing".emphasis(), branch.accent());
    ctx.stack.cleanup_after_merge(pr).await?;
    println!("{} {}", format!("{CHECK} Closed:").success(), pr.accent());
    Ok(())
}
