//! Merge readiness - pure assessment of a PR's mergeability
//!
//! No I/O happens here: the PR details are fetched beforehand, which keeps
//! the decision easy to unit test.

use crate::types::{PrState, PullRequestDetails};
use std::fmt;

/// Why a PR cannot be merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// The PR is already merged
    AlreadyMerged,
    /// The PR was closed without merging
    Closed,
    /// The PR conflicts with its base branch
    Conflicts {
        /// Base branch the PR targets
        base: String,
    },
    /// Required checks are failing
    FailingChecks,
    /// GitHub refuses for another reason
    Other,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyMerged => write!(f, "already merged"),
            Self::Closed => write!(f, "closed"),
            Self::Conflicts { base } => write!(f, "cannot be merged cleanly into {base}"),
            Self::FailingChecks => write!(f, "has some failing checks"),
            Self::Other => write!(f, "cannot be merged right now"),
        }
    }
}

/// Whether a PR can be merged, as far as GitHub knows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mergeability {
    /// The PR can be merged
    Mergeable,
    /// GitHub is still computing mergeability
    Pending,
    /// The PR cannot be merged
    Blocked(BlockReason),
}

impl Mergeability {
    /// Whether GitHub has not decided yet
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for Mergeability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mergeable => write!(f, "mergeable"),
            Self::Pending => write!(f, "still being checked by GitHub"),
            Self::Blocked(reason) => reason.fmt(f),
        }
    }
}

/// Assess a PR on its own, ignoring the PRs it depends on.
pub fn assess_mergeability(details: &PullRequestDetails) -> Mergeability {
    match details.state {
        PrState::Merged => return Mergeability::Blocked(BlockReason::AlreadyMerged),
        PrState::Closed => return Mergeability::Blocked(BlockReason::Closed),
        PrState::Open => {}
    }

    match details.mergeable {
        None => Mergeability::Pending,
        Some(true) => Mergeability::Mergeable,
        Some(false) => Mergeability::Blocked(match details.mergeable_state.as_deref() {
            Some("dirty") => BlockReason::Conflicts {
                base: details.base_ref.clone(),
            },
            Some("blocked") => BlockReason::FailingChecks,
            _ => BlockReason::Other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrNumber;

    fn details(state: PrState, mergeable: Option<bool>, mergeable_state: Option<&str>) -> PullRequestDetails {
        PullRequestDetails {
            number: PrNumber(3),
            title: "Add parser".to_string(),
            body: None,
            state,
            is_draft: false,
            mergeable,
            mergeable_state: mergeable_state.map(str::to_string),
            head_ref: "octocat/pr/3".to_string(),
            head_sha: "abc".to_string(),
            base_ref: "main".to_string(),
            html_url: "https://github.com/acme/widgets/pull/3".to_string(),
        }
    }

    #[test]
    fn test_unknown_mergeability_is_pending() {
        let result = assess_mergeability(&details(PrState::Open, None, Some("unknown")));
        assert!(result.is_pending());
    }

    #[test]
    fn test_mergeable() {
        let result = assess_mergeability(&details(PrState::Open, Some(true), Some("clean")));
        assert_eq!(result, Mergeability::Mergeable);
    }

    #[test]
    fn test_dirty_means_conflicts_with_base() {
        let result = assess_mergeability(&details(PrState::Open, Some(false), Some("dirty")));
        assert_eq!(
            result,
            Mergeability::Blocked(BlockReason::Conflicts {
                base: "main".to_string()
            })
        );
        assert_eq!(result.to_string(), "cannot be merged cleanly into main");
    }

    #[test]
    fn test_blocked_means_failing_checks() {
        let result = assess_mergeability(&details(PrState::Open, Some(false), Some("blocked")));
        assert_eq!(result, Mergeability::Blocked(BlockReason::FailingChecks));
    }

    #[test]
    fn test_other_states() {
        let result = assess_mergeability(&details(PrState::Open, Some(false), Some("behind")));
        assert_eq!(result, Mergeability::Blocked(BlockReason::Other));
    }

    #[test]
    fn test_merged_and_closed_are_blocked_whatever_github_says() {
        assert_eq!(
            assess_mergeability(&details(PrState::Merged, Some(true), None)),
            Mergeability::Blocked(BlockReason::AlreadyMerged)
        );
        assert_eq!(
            assess_mergeability(&details(PrState::Closed, None, None)),
            Mergeability::Blocked(BlockReason::Closed)
        );
    }
}
