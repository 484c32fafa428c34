//! Branch command - per-branch metadata

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use opp::error::{Error, Result};
use std::path::Path;

/// Run `branch tag`
pub async fn run_tag(root: &Path, tag: &str) -> Result<()> {
    if tag.trim().is_empty() {
        return Err(Error::InvalidArgument("tag is empty".to_string()));
    }
    let ctx = CommandContext::new(root)?;
    let branch = ctx.stack.tag_current_branch(tag).await?;
    println!("{} Tagged {} with {}", check(), branch.accent(), tag.trim().emphasis());
    Ok(())
}
