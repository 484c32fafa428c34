//! Progress reporting for stack operations

use crate::types::{Branch, PrNumber, Sha};
use async_trait::async_trait;

/// Something a stack operation did or is about to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    /// A PR is about to be rebased onto `onto`
    RebaseStarted {
        /// PR being rebased
        pr: PrNumber,
        /// Branch it is rebased onto
        onto: Branch,
    },
    /// The silent rebase failed; the user is asked to resolve interactively
    RebaseConflict {
        /// PR being rebased
        pr: PrNumber,
        /// Branch it is rebased onto
        onto: Branch,
    },
    /// A PR was rebased and now has a new tip
    Rebased {
        /// PR that was rebased
        pr: PrNumber,
        /// New local tip
        tip: Sha,
    },
    /// A PR's local tip was force-pushed to its remote branch
    Pushed {
        /// PR that was pushed
        pr: PrNumber,
        /// Remote tip that was overwritten, `None` for a new remote branch
        previous: Option<Sha>,
        /// Tip now on the remote
        tip: Sha,
    },
    /// After rebasing, the PR's tip turned out to be part of the base branch
    DetectedMerged {
        /// PR found merged
        pr: PrNumber,
    },
    /// A dependent PR was reparented because its ancestor went away
    Reparented {
        /// Dependent PR
        pr: PrNumber,
        /// Ancestor that went away
        previous: PrNumber,
        /// New ancestor
        onto: Branch,
    },
    /// A PR's local branch, remote branch and state are being removed
    Removing {
        /// PR being removed
        pr: PrNumber,
        /// Local tip before removal, if the branch still existed
        tip: Option<Sha>,
    },
    /// Deleting a remote branch failed; cleanup continued
    RemoteDeleteFailed {
        /// PR whose remote branch survived
        pr: PrNumber,
        /// Error text
        reason: String,
    },
    /// HEAD moved to another branch
    CheckedOut {
        /// Branch now checked out
        branch: Branch,
    },
}

/// Callback for reporting progress during stack operations
///
/// Implement this to render progress in a CLI, record it in tests, or
/// forward it elsewhere.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called for every structured event
    async fn on_event(&self, event: &StackEvent);

    /// Called with free-form status messages
    async fn on_message(&self, message: &str);
}

/// No-op progress callback for when progress reporting isn't needed
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_event(&self, _event: &StackEvent) {}
    async fn on_message(&self, _message: &str) {}
}
