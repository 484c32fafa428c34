//! Push command - push a PR chain

use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize};
use anstream::println;
use opp::error::Result;
use opp::submit::push_stack;
use std::path::Path;

/// Run the push command
pub async fn run_push(root: &Path, pr: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new(root)?;
    let pr = ctx.stack.resolve_pr(pr).await?;
    ctx.fetch().await?;

    let pushed = push_stack(&ctx.stack, pr).await?;
    println!(
        "{} {} PR(s) pushed",
        format!("{CHECK} Push complete:").success(),
        pushed.len().accent()
    );
    Ok(())
}
