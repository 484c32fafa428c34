//! Command implementations

pub mod branch;
pub mod checkout;
pub mod clean;
pub mod close;
pub mod comment;
pub mod context;
pub mod init;
pub mod merge;
pub mod pr;
pub mod push;
pub mod rebase;
pub mod status;
pub mod style;

use anstream::println;
use async_trait::async_trait;
use opp::stack::{ProgressCallback, StackEvent};
use opp::types::Branch;
use style::{Stylize, arrow, check, cross};

/// Renders stack progress on the terminal
pub struct CliProgress;

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_event(&self, event: &StackEvent) {
        match event {
            StackEvent::RebaseStarted { pr, onto } => {
                println!("{} Rebasing {} onto {}", arrow(), pr.accent(), onto.accent());
            }
            StackEvent::RebaseConflict { pr, onto } => print_conflict_help(&pr.to_string(), onto),
            StackEvent::Rebased { pr, tip } => {
                println!("{} {} is now at {}", check(), pr.accent(), tip.short().muted());
            }
            StackEvent::Pushed { pr, previous, tip } => match previous {
                Some(previous) if previous != tip => println!(
                    "{} Pushed {} ({} -> {})",
                    check(),
                    pr.accent(),
                    previous.short().muted(),
                    tip.short().muted()
                ),
                _ => println!("{} Pushed {} ({})", check(), pr.accent(), tip.short().muted()),
            },
            StackEvent::DetectedMerged { pr } => {
                println!("{} {} has been merged", check(), pr.accent());
            }
            StackEvent::Reparented { pr, previous, onto } => {
                println!(
                    "{} {} is now stacked on {} ({} is gone)",
                    arrow(),
                    pr.accent(),
                    onto.accent(),
                    previous.muted()
                );
            }
            StackEvent::Removing { pr, tip } => match tip {
                Some(tip) => println!(
                    "{} Removing {} (tip was {})",
                    arrow(),
                    pr.accent(),
                    tip.short().muted()
                ),
                None => println!("{} Removing {}", arrow(), pr.accent()),
            },
            StackEvent::RemoteDeleteFailed { pr, reason } => {
                println!(
                    "{} Could not delete the remote branch of {}: {}",
                    cross(),
                    pr.accent(),
                    reason.warn()
                );
            }
            StackEvent::CheckedOut { branch } => {
                println!("{} Switched to {}", arrow(), branch.accent());
            }
        }
    }

    async fn on_message(&self, message: &str) {
        println!("{}", message.muted());
    }
}

fn print_conflict_help(pr: &str, onto: &Branch) {
    println!(
        "{} {} does not rebase cleanly onto {}",
        cross(),
        pr.accent(),
        onto.accent()
    );
    if onto.is_pr() {
        println!(
            "{}",
            "Some commits conflict with the PR below. Resolve them in the interactive rebase, \
             then run 'opp rebase' again to update the rest of the stack."
                .muted()
        );
    } else {
        println!(
            "{}",
            "Some commits conflict with the base branch. Resolve them in the interactive rebase, \
             dropping commits that were already merged, then run 'opp rebase' again."
                .muted()
        );
    }
}
