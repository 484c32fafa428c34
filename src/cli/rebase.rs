//! Rebase command - rebase a PR chain onto the latest base branch

use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize};
use anstream::println;
use opp::error::{Error, Result};
use opp::stack::RebaseOutcome;
use std::path::Path;

/// Run the rebase command
pub async fn run_rebase(root: &Path, pr: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new(root)?;
    let pr = ctx.stack.resolve_pr(pr).await?;
    if ctx.stack.git().has_local_changes().await? {
        return Err(Error::DirtyWorkingTree);
    }
    ctx.fetch().await?;

    match ctx.stack.rebase_stack(pr).await? {
        RebaseOutcome::Rebased => {
            println!("{} {} is up to date", format!("{CHECK} Rebased:").success(), pr.accent());
            println!("{}", "Run 'opp push' to update the PRs on GitHub".muted());
        }
        RebaseOutcome::Merged => {
            println!("{} {} was already merged", format!("{CHECK} Done:").success(), pr.accent());
        }
    }
    Ok(())
}
