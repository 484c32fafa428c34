//! Merge execution - effectful operations
//!
//! Merging only ever happens at the bottom of a stack: a PR with unmerged
//! ancestors is refused. Once GitHub has merged the PR, the cleanup cascade
//! removes it locally and reparents its dependents.

use crate::error::{Error, Result};
use crate::merge::readiness::{Mergeability, assess_mergeability};
use crate::platform::PlatformService;
use crate::stack::Stack;
use crate::types::{Branch, MergeMethod, PrNumber, PullRequestDetails};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default number of times mergeability is polled
pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;

/// Default wait between mergeability polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Options for merging a PR
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Merge method passed to GitHub
    pub method: MergeMethod,
    /// How many times to ask GitHub whether the PR is mergeable
    pub poll_attempts: u32,
    /// Wait between two polls
    pub poll_interval: Duration,
}

impl MergeOptions {
    /// Default polling with the given merge method
    pub const fn new(method: MergeMethod) -> Self {
        Self {
            method,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of a successful merge
#[derive(Debug, Clone)]
pub struct MergeExecutionResult {
    /// PR that was merged
    pub pr: PrNumber,
    /// Commit GitHub created on the base branch, if reported
    pub sha: Option<String>,
}

/// Poll GitHub until it has decided whether the PR is mergeable.
///
/// Fails with [`Error::MergeabilityUnknown`] if it is still undecided after
/// every attempt.
pub async fn wait_for_mergeability(
    platform: &dyn PlatformService,
    pr: PrNumber,
    options: &MergeOptions,
) -> Result<(PullRequestDetails, Mergeability)> {
    let attempts = options.poll_attempts.max(1);
    for attempt in 1..=attempts {
        let details = platform.get_pr_details(pr).await?;
        let mergeability = assess_mergeability(&details);
        if !mergeability.is_pending() {
            return Ok((details, mergeability));
        }
        debug!(%pr, attempt, "mergeability not computed yet");
        if attempt < attempts {
            tokio::time::sleep(options.poll_interval).await;
        }
    }
    Err(Error::MergeabilityUnknown(pr))
}

/// Merge a PR that has no unmerged ancestors, then clean it up locally.
#[instrument(skip(stack, platform, options))]
pub async fn execute_merge(
    stack: &Stack,
    platform: &dyn PlatformService,
    pr: PrNumber,
    options: &MergeOptions,
) -> Result<MergeExecutionResult> {
    let ancestors = stack.all_ancestors(pr).await?;
    if let Some(&first) = ancestors.first() {
        return Err(Error::UnmergedAncestors { pr, first });
    }

    let tip = stack.require_local_tip(&Branch::Pr(pr)).await?;
    let (_, mergeability) = wait_for_mergeability(platform, pr, options).await?;
    if let Mergeability::Blocked(reason) = mergeability {
        return Err(Error::NotMergeable {
            pr,
            reason: reason.to_string(),
        });
    }

    let result = platform.merge_pr(pr, &tip, options.method).await?;
    if !result.merged {
        return Err(Error::NotMergeable {
            pr,
            reason: result
                .message
                .unwrap_or_else(|| "GitHub did not merge it".to_string()),
        });
    }

    info!(%pr, sha = ?result.sha, "merged");
    stack.cleanup_after_merge(pr).await?;
    Ok(MergeExecutionResult {
        pr,
        sha: result.sha,
    })
}
