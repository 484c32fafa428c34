//! Checkout command - switch to a PR branch

use crate::cli::context::CommandContext;
use opp::error::Result;
use opp::types::parse_pr_argument;
use std::path::Path;

/// Run the checkout command
///
/// The switch itself is reported through the stack's progress output.
pub async fn run_checkout(root: &Path, pr: &str) -> Result<()> {
    let pr = parse_pr_argument(pr)?;
    let ctx = CommandContext::new(root)?;
    ctx.stack.checkout_pr(pr).await
}
