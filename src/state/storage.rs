//! Persistence for branch state in `.opp/state/`.
//!
//! One file per branch, named after the local branch, so PR state lives at
//! `.opp/state/pr/<n>`.

use super::{BranchState, StoredBranchState};
use crate::config::opp_dir;
use crate::error::{Error, Result};
use crate::types::{Branch, PR_BRANCH_PREFIX, PrNumber};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name for state within `.opp/`.
const STATE_DIR: &str = "state";

/// Get path to the state directory of a repository.
pub fn state_dir(repo_root: &Path) -> PathBuf {
    opp_dir(repo_root).join(STATE_DIR)
}

/// File-backed store of [`BranchState`] records
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Store rooted at the repository's `.opp/state/`
    pub fn new(repo_root: &Path) -> Self {
        Self {
            dir: state_dir(repo_root),
        }
    }

    /// Path of the file holding a branch's state
    pub fn state_path(&self, branch: &Branch) -> PathBuf {
        self.dir.join(branch.local_name())
    }

    /// Whether a record exists for the branch
    pub fn has_state(&self, branch: &Branch) -> bool {
        self.state_path(branch).is_file()
    }

    /// Load a branch's state, creating and persisting an empty record if absent.
    pub fn get_state(&self, branch: &Branch) -> Result<BranchState> {
        if let Some(state) = self.load_state(branch)? {
            return Ok(state);
        }
        debug!(%branch, "creating empty branch state");
        let state = BranchState::default();
        self.save_state(branch, &state)?;
        Ok(state)
    }

    /// Load a branch's state without creating it.
    pub fn load_state(&self, branch: &Branch) -> Result<Option<BranchState>> {
        let path = self.state_path(branch);
        match fs::read_to_string(&path) {
            Ok(content) => {
                let stored: StoredBranchState = toml::from_str(&content).map_err(|e| {
                    Error::State(format!("failed to parse {}: {e}", path.display()))
                })?;
                Ok(Some(stored.into()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::State(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Persist a branch's full state.
    pub fn save_state(&self, branch: &Branch, state: &BranchState) -> Result<()> {
        let path = self.state_path(branch);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::State(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let content = toml::to_string_pretty(&StoredBranchState::from(state))
            .map_err(|e| Error::State(format!("failed to serialize state of {branch}: {e}")))?;

        let content_with_header = format!(
            "# opp branch state\n# Auto-generated - manual edits may be overwritten\n\n{content}"
        );

        fs::write(&path, content_with_header)
            .map_err(|e| Error::State(format!("failed to write {}: {e}", path.display())))
    }

    /// Delete a branch's state; deleting an absent record succeeds.
    pub fn delete_state(&self, branch: &Branch) -> Result<()> {
        let path = self.state_path(branch);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::State(format!(
                "failed to delete {}: {e}",
                path.display()
            ))),
        }
    }

    /// PR numbers with a state record, ascending
    pub fn all_local_pr_numbers(&self) -> Result<Vec<PrNumber>> {
        let pr_dir = self.dir.join(PR_BRANCH_PREFIX.trim_end_matches('/'));
        let entries = match fs::read_dir(&pr_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::State(format!(
                    "failed to list {}: {e}",
                    pr_dir.display()
                )));
            }
        };

        let mut numbers: Vec<PrNumber> = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u64>().ok())
            .filter_map(PrNumber::new)
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }
}
