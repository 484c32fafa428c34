//! Clean command - drop PRs that are gone on GitHub

use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize, arrow, cross};
use anstream::println;
use opp::error::Result;
use opp::reconcile::{CleanReason, ReconcileAction, Reconciler};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Run the clean command
pub async fn run_clean(root: &Path, jobs: Option<usize>) -> Result<()> {
    let ctx = CommandContext::new(root)?;
    let platform = ctx.platform().await?;
    ctx.fetch().await?;

    let prs = ctx.stack.all_prs().await?;
    if prs.is_empty() {
        println!("{}", "No local PRs".muted());
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut reconciler = Reconciler::new(ctx.stack.clone(), platform);
    if let Some(jobs) = jobs {
        reconciler = reconciler.with_workers(jobs);
    }

    let total = prs.len();
    let mut results = reconciler.run(prs, cancel.clone()).await;
    results.sort_by_key(|r| r.pr);

    let (mut cleaned, mut kept, mut failed) = (0, 0, 0);
    for result in &results {
        match &result.outcome {
            Ok(ReconcileAction::Kept) => kept += 1,
            Ok(ReconcileAction::Cleaned(reason)) => {
                cleaned += 1;
                let why = match reason {
                    CleanReason::RemoteBranchGone => "remote branch deleted".to_string(),
                    CleanReason::NotOpen(state) => format!("PR is {state}"),
                };
                println!("{} {} cleaned: {}", arrow(), result.pr.accent(), why.muted());
            }
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", cross(), result.pr.accent(), e.warn());
                if e.is_transient() {
                    println!("  {}", "this may succeed if you run 'opp clean' again".muted());
                }
            }
        }
    }

    if cancel.is_cancelled() {
        println!(
            "{}",
            format!("Interrupted after checking {} of {total} PR(s)", results.len()).warn()
        );
    }
    println!(
        "{} {} cleaned, {} kept, {} failed",
        format!("{CHECK} Clean complete:").success(),
        cleaned.accent(),
        kept.accent(),
        failed.accent()
    );
    Ok(())
}
