//! Error types for opp

use crate::types::PrNumber;
use thiserror::Error;

/// Errors produced by opp operations
#[derive(Debug, Error)]
pub enum Error {
    /// A branch name that is not of the form `pr/<n>`
    #[error("'{0}' is not a PR branch (expected pr/<number>)")]
    NotAPr(String),

    /// Local or remote branch does not exist
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Head and base branch share no history
    #[error("{head} has no common history with {base}")]
    DisjointHistory {
        /// Revision whose history was inspected
        head: String,
        /// Base branch reference it was compared against
        base: String,
    },

    /// Stored ancestor chain is malformed (cycle or runaway depth)
    #[error("corrupted stack state: {0}")]
    StructuralInconsistency(String),

    /// A rebase stopped on conflicts and was left for the user
    #[error("{branch} was not rebased: finish the rebase with git, then re-run")]
    RebaseUnfinished {
        /// Branch that is mid-rebase
        branch: String,
    },

    /// A rebase is already stopped in the working tree
    #[error("a rebase is already in progress, finish or abort it first")]
    RebaseInProgress,

    /// Working tree has uncommitted changes
    #[error("there are uncommitted changes, commit or stash them first")]
    DirtyWorkingTree,

    /// The revision is already the tip of an existing PR
    #[error("this revision is already {0}, use 'opp push' to update it")]
    AlreadyAPrBranch(PrNumber),

    /// Current branch is not a PR branch and none was named
    #[error("not on a PR branch, pass a PR number")]
    NotOnPrBranch,

    /// The PR was opened but its commits stayed on the starting branch
    #[error("{pr} was created, but its commits could not be removed from {branch}")]
    ExtractFailed {
        /// PR that was opened
        pr: PrNumber,
        /// Branch that still has the commits
        branch: String,
    },

    /// PR still depends on unmerged PRs
    #[error("{pr} depends on unmerged PRs, merge {first} first")]
    UnmergedAncestors {
        /// PR being merged
        pr: PrNumber,
        /// Root-most unmerged ancestor
        first: PrNumber,
    },

    /// Ancestor tip is missing from the descendant's history
    #[error("{pr} does not contain the tip of {ancestor}, run 'opp rebase' first")]
    NeedsRebase {
        /// PR being pushed
        pr: PrNumber,
        /// Ancestor whose tip is missing
        ancestor: PrNumber,
    },

    /// Platform reports the PR as not mergeable
    #[error("{pr} cannot be merged: {reason}")]
    NotMergeable {
        /// PR that was checked
        pr: PrNumber,
        /// Human-readable reason
        reason: String,
    },

    /// Mergeability stayed unknown for every poll attempt
    #[error("GitHub is still computing whether {0} can be merged, try again later")]
    MergeabilityUnknown(PrNumber),

    /// Remote PR head differs from the local tip
    #[error("remote tip of {0} differs from the local tip, run 'opp push' first")]
    StaleRemoteTip(PrNumber),

    /// Another PR or issue took the predicted number
    #[error("lost race condition when creating {0}")]
    LostPrCreationRace(PrNumber),

    /// Retries for the predicted number were exhausted
    #[error("lost race condition when creating a PR too many times, aborting")]
    LostPrCreationRaceRepeatedly,

    /// Invalid user-supplied argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Git command error
    #[error("git {command} failed: {stderr}")]
    Git {
        /// Arguments passed to git
        command: String,
        /// Captured standard error
        stderr: String,
    },

    /// GitHub API error
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// A network call exceeded its deadline
    #[error("{0} timed out, consider increasing github.timeout_secs")]
    Timeout(String),

    /// Authentication error
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Branch state persistence error
    #[error("state error: {0}")]
    State(String),

    /// A background task panicked or was aborted
    #[error("task failed: {0}")]
    Task(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the repository was left in a state opp
    /// cannot reason about and the process must stop immediately.
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Whether retrying the same operation later may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::GitHubApi(_)
                | Self::Timeout(_)
                | Self::MergeabilityUnknown(_)
                | Self::StaleRemoteTip(_)
        )
    }
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubApi(err.to_string())
    }
}

/// Result type alias using opp's Error
pub type Result<T> = std::result::Result<T, Error>;
