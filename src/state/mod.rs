//! Per-branch stack state
//!
//! Each PR branch remembers its ancestor and every tip it (and its ancestor)
//! has ever had. Tips are never forgotten, which lets a rewritten ancestor be
//! recognised in a descendant's history after an amend, rebase or merge.

mod storage;

pub use storage::{StateStore, state_dir};

use crate::types::{Branch, Sha};
use serde::{Deserialize, Serialize};

/// State tracked for one branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchState {
    /// Branch this one is stacked on; `None` until first set
    pub ancestor: Option<Branch>,
    /// Tips the ancestor had that this branch inherited when an
    /// intermediate PR disappeared
    pub ancestor_known_tips: Vec<Sha>,
    /// Every tip this branch has had, oldest first
    pub known_tips: Vec<Sha>,
    /// Free-form tag
    pub tag: String,
}

impl BranchState {
    /// Point this branch at a new ancestor
    pub fn set_ancestor(&mut self, ancestor: Branch) {
        self.ancestor = Some(ancestor);
    }

    /// Record a tip of this branch; returns whether it was new.
    pub fn remember_tip(&mut self, tip: Sha) -> bool {
        append_unique(&mut self.known_tips, tip)
    }

    /// Record tips that identify the ancestor in this branch's history.
    pub fn inherit_ancestor_tips(&mut self, tips: &[Sha]) {
        for tip in tips {
            append_unique(&mut self.ancestor_known_tips, tip.clone());
        }
    }
}

fn append_unique(tips: &mut Vec<Sha>, tip: Sha) -> bool {
    if tips.contains(&tip) {
        return false;
    }
    tips.push(tip);
    true
}

/// On-disk layout of [`BranchState`]
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredBranchState {
    tag: String,
    known_tips: Vec<Sha>,
    ancestor: StoredAncestor,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredAncestor {
    name: String,
    known_tips: Vec<Sha>,
}

impl From<StoredBranchState> for BranchState {
    fn from(stored: StoredBranchState) -> Self {
        let name = stored.ancestor.name.trim();
        Self {
            ancestor: (!name.is_empty()).then(|| Branch::parse(name)),
            ancestor_known_tips: stored.ancestor.known_tips,
            known_tips: stored.known_tips,
            tag: stored.tag,
        }
    }
}

impl From<&BranchState> for StoredBranchState {
    fn from(state: &BranchState) -> Self {
        Self {
            tag: state.tag.clone(),
            known_tips: state.known_tips.clone(),
            ancestor: StoredAncestor {
                name: state
                    .ancestor
                    .as_ref()
                    .map(Branch::local_name)
                    .unwrap_or_default(),
                known_tips: state.ancestor_known_tips.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrNumber;

    #[test]
    fn test_remember_tip_is_append_only() {
        let mut state = BranchState::default();
        assert!(state.remember_tip(Sha::from("a")));
        assert!(state.remember_tip(Sha::from("b")));
        assert!(!state.remember_tip(Sha::from("a")));
        assert_eq!(state.known_tips, vec![Sha::from("a"), Sha::from("b")]);
    }

    #[test]
    fn test_inherit_ancestor_tips_skips_duplicates() {
        let mut state = BranchState::default();
        state.inherit_ancestor_tips(&[Sha::from("x")]);
        state.inherit_ancestor_tips(&[Sha::from("x"), Sha::from("y")]);
        assert_eq!(
            state.ancestor_known_tips,
            vec![Sha::from("x"), Sha::from("y")]
        );
    }

    #[test]
    fn test_stored_ancestor_is_decoded_once() {
        let stored: StoredBranchState = toml::from_str(
            r#"
            known_tips = ["c1"]
            [ancestor]
            name = "pr/4"
            known_tips = ["c0"]
            "#,
        )
        .unwrap();
        let state = BranchState::from(stored);
        assert_eq!(state.ancestor, Some(Branch::Pr(PrNumber(4))));
        assert_eq!(state.ancestor_known_tips, vec![Sha::from("c0")]);
        assert_eq!(state.known_tips, vec![Sha::from("c1")]);
    }

    #[test]
    fn test_empty_ancestor_name_is_unset() {
        let state = BranchState::from(StoredBranchState::default());
        assert_eq!(state.ancestor, None);

        let stored = StoredBranchState::from(&state);
        assert_eq!(stored.ancestor.name, "");
    }

    #[test]
    fn test_base_ancestor_survives_encoding() {
        let mut state = BranchState::default();
        state.set_ancestor(Branch::Base("main".to_string()));
        let stored = StoredBranchState::from(&state);
        assert_eq!(stored.ancestor.name, "main");
        assert_eq!(BranchState::from(stored).ancestor, state.ancestor);
    }
}
