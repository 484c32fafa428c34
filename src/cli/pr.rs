//! Pr command - open a PR on top of the stack

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, hyperlink};
use anstream::println;
use opp::error::Result;
use opp::submit::{CreateOptions, create_pull_request};
use opp::types::Branch;
use std::path::Path;

/// Run the pr command
pub async fn run_pr(root: &Path, options: CreateOptions) -> Result<()> {
    let ctx = CommandContext::new(root)?;
    let platform = ctx.platform().await?;
    ctx.fetch().await?;

    let created = create_pull_request(&ctx.stack, platform.as_ref(), &options).await?;
    let branch = Branch::Pr(created.pr.number);
    println!(
        "{} Created {} on top of {}",
        check(),
        created.pr.number.accent(),
        created.ancestor.accent()
    );
    println!("  {}", hyperlink(&created.pr.html_url, &created.pr.html_url));
    if !created.checked_out {
        println!(
            "{}",
            format!("Local branch {branch} created at {}", created.tip.short()).muted()
        );
    }
    Ok(())
}
