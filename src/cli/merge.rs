//! Merge command - merge the PR at the bottom of a stack

use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize};
use anstream::println;
use opp::error::Result;
use opp::merge::{MergeOptions, execute_merge};
use opp::types::MergeMethod;
use std::path::Path;

/// Run the merge command
pub async fn run_merge(root: &Path, pr: Option<&str>, method: Option<MergeMethod>) -> Result<()> {
    let ctx = CommandContext::new(root)?;
    let pr = ctx.stack.resolve_pr(pr).await?;
    let platform = ctx.platform().await?;
    ctx.fetch().await?;

    let options = MergeOptions::new(method.unwrap_or(ctx.config.github.merge_method));
    println!(
        "{} {} {}",
        "Merging".emphasis(),
        pr.accent(),
        format!("({})", options.method).muted()
    );
    let merged = execute_merge(&ctx.stack, platform.as_ref(), pr, &options).await?;

    match merged.sha {
        Some(sha) => println!(
            "{} {} merged as {}",
            format!("{CHECK} Merged:").success(),
            merged.pr.accent(),
            sha.get(..7).unwrap_or(&sha).muted()
        ),
        None => println!("{} {}", format!("{CHECK} Merged:").success(), merged.pr.accent()),
    }
    Ok(())
}
