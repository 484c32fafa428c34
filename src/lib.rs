//! opp - stacked pull requests for git and GitHub
//!
//! Each PR lives on a local branch `pr/<n>` and remembers which branch it is
//! stacked on, plus every tip it and its ancestors have had. That history is
//! what lets a rebase replay exactly the PR's own commits after an ancestor
//! was amended, and lets merged PRs vanish from the middle of a chain.
//!
//! # Modules
//!
//! - [`git`]: typed port over the git command line
//! - [`state`]: per-PR state files under `.opp/state`
//! - [`stack`]: ancestor resolution, branching-point detection, the rebase
//!   and cleanup cascades
//! - [`submit`]: creating PRs and pushing chains
//! - [`merge`]: mergeability assessment and merging
//! - [`reconcile`]: concurrent pipeline removing PRs that are closed remotely
//! - [`platform`]: GitHub service behind a trait
//! - [`auth`], [`config`]: credentials and settings

pub mod auth;
pub mod config;
pub mod error;
pub mod git;
pub mod merge;
pub mod platform;
pub mod reconcile;
pub mod stack;
pub mod state;
pub mod submit;
pub mod types;

pub use error::{Error, Result};
