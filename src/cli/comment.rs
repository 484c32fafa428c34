//! Comment command

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use opp::error::{Error, Result};
use std::path::Path;

/// Run the comment command
pub async fn run_comment(root: &Path, pr: Option<&str>, body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(Error::InvalidArgument("comment is empty".to_string()));
    }
    let ctx = CommandContext::new(root)?;
    let pr = ctx.stack.resolve_pr(pr).await?;
    let platform = ctx.platform().await?;

    platform.create_pr_comment(pr, body).await?;
    println!("{} Commented on {}", check(), pr.accent());
    Ok(())
}
