//! Status command - show local PR chains

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, cross, hyperlink};
use anstream::println;
use opp::error::Result;
use opp::merge::{Mergeability, assess_mergeability};
use opp::platform::PlatformService;
use opp::types::{Branch, PrNumber};
use std::collections::HashSet;
use std::path::Path;

/// Run the status command
pub async fn run_status(root: &Path) -> Result<()> {
    let ctx = CommandContext::new(root)?;
    let platform = ctx.platform().await?;
    ctx.fetch().await?;

    let mut chains = Vec::new();
    for pr in ctx.stack.all_prs().await? {
        let mut chain = ctx.stack.all_ancestors(pr).await?;
        chain.push(pr);
        chains.push(chain);
    }
    // longest chains first so their members are not listed on their own
    chains.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let repo = platform.config();
    println!("{} {}/{}", "Pull requests in".muted(), repo.owner.emphasis(), repo.repo.emphasis());
    if chains.is_empty() {
        println!("{}", "No local PRs".muted());
        return Ok(());
    }

    let mut mentioned = HashSet::new();
    for chain in chains {
        let Some(&leaf) = chain.last() else { continue };
        if !mentioned.insert(leaf) {
            continue;
        }
        println!();
        if chain.len() > 1 {
            println!("{} {}", "PR chain".emphasis(), chain[0].accent());
            for (i, &pr) in chain.iter().enumerate() {
                mentioned.insert(pr);
                print_status(&ctx, platform.as_ref(), pr, &format!("  {}. ", i + 1)).await?;
            }
        } else {
            print_status(&ctx, platform.as_ref(), leaf, "").await?;
        }
    }
    Ok(())
}

async fn print_status(
    ctx: &CommandContext,
    platform: &dyn PlatformService,
    pr: PrNumber,
    prefix: &str,
) -> Result<()> {
    let indent = " ".repeat(prefix.len() + 2);
    let branch = Branch::Pr(pr);
    let details = match platform.get_pr_details(pr).await {
        Ok(details) => details,
        Err(e) => {
            println!("{prefix}{} {} {}", "PR".emphasis(), pr.accent(), cross());
            println!("{indent}{}", e.warn());
            return Ok(());
        }
    };

    let tag = ctx
        .stack
        .store()
        .load_state(&branch)?
        .map(|state| state.tag)
        .filter(|tag| !tag.is_empty())
        .map(|tag| format!("[{tag}] "))
        .unwrap_or_default();
    println!(
        "{prefix}{} {} {}{}",
        "PR".emphasis(),
        pr.accent(),
        tag.emphasis(),
        details.title.muted()
    );
    println!("{indent}{}", hyperlink(&details.html_url, &details.html_url));

    let mergeability = assess_mergeability(&details);
    match mergeability {
        Mergeability::Mergeable => println!("{indent}mergeable  {}", check()),
        other => println!("{indent}mergeable  {} - {}", cross(), other),
    }

    let local = ctx.stack.local_tip(&branch).await?;
    let remote = ctx.stack.remote_tip(&branch).await?;
    let up_to_date = local.is_some() && local == remote;
    println!("{indent}up-to-date {}", if up_to_date { check() } else { cross() });

    let checks = platform.checks_passing(&details.head_sha).await?;
    println!("{indent}checks     {}", if checks { check() } else { cross() });
    Ok(())
}
