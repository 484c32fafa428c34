//! Stack engine
//!
//! [`Stack`] ties the git port, the state store and the configuration
//! together and implements the operations on chains of dependent PRs:
//! - identity: ancestor resolution that heals around vanished PRs
//! - detect: where a revision branches off existing PRs
//! - rebase: the ancestor-first rebase cascade
//! - cleanup: removing PRs and reparenting their dependents

mod cleanup;
mod detect;
mod identity;
mod progress;
mod rebase;

pub use detect::BranchingPoint;
pub use identity::MAX_STACK_DEPTH;
pub use progress::{NoopProgress, ProgressCallback, StackEvent};
pub use rebase::RebaseOutcome;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::git::GitRepo;
use crate::state::StateStore;
use crate::types::{Branch, PrNumber, Sha, extract_pr_number, parse_pr_argument};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Stacked-PR operations over one working tree
pub struct Stack {
    git: GitRepo,
    store: StateStore,
    config: Config,
    progress: Arc<dyn ProgressCallback>,
    /// Serializes cleanup cascades, which mutate several branches' state
    cascade_lock: Mutex<()>,
}

impl Stack {
    /// Create a stack over an existing git port
    pub fn new(git: GitRepo, config: Config) -> Self {
        let store = StateStore::new(git.root());
        Self {
            git,
            store,
            config,
            progress: Arc::new(NoopProgress),
            cascade_lock: Mutex::new(()),
        }
    }

    /// Open the working tree at `repo_root` with the given config
    ///
    /// Git never prompts for credentials, so a remote that wants them fails
    /// instead of hanging until the network timeout.
    pub fn open(repo_root: &Path, config: Config) -> Self {
        let git = GitRepo::new(repo_root, config.repo.remote.clone(), config.timeout())
            .with_env("GIT_TERMINAL_PROMPT", "0");
        Self::new(git, config)
    }

    /// Report progress through `progress` instead of discarding it
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// The git port
    pub const fn git(&self) -> &GitRepo {
        &self.git
    }

    /// The state store
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    /// The configuration
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The branch every stack is rooted on
    pub fn base_branch(&self) -> Branch {
        self.config.base_branch()
    }

    /// Name of a branch on the remote
    pub fn remote_name(&self, branch: &Branch) -> String {
        branch.remote_name(&self.config.github.login)
    }

    /// Local tip of a branch
    pub async fn local_tip(&self, branch: &Branch) -> Result<Option<Sha>> {
        self.git.local_branch_tip(&branch.local_name()).await
    }

    /// Local tip of a branch that must exist
    pub async fn require_local_tip(&self, branch: &Branch) -> Result<Sha> {
        self.local_tip(branch)
            .await?
            .ok_or_else(|| Error::BranchNotFound(branch.local_name()))
    }

    /// Remote-tracking tip of a branch, as of the last fetch
    pub async fn remote_tip(&self, branch: &Branch) -> Result<Option<Sha>> {
        self.git.remote_branch_tip(&self.remote_name(branch)).await
    }

    /// Reference a rebase onto `branch` should target
    ///
    /// The base branch is taken from the remote so local commits on it never
    /// leak into a PR; PR branches are taken locally.
    pub fn rebase_target(&self, branch: &Branch) -> String {
        match branch {
            Branch::Base(name) => self.git.remote_ref(name),
            Branch::Pr(_) => branch.local_name(),
        }
    }

    /// The branch HEAD is on
    pub async fn current_branch(&self) -> Result<Option<Branch>> {
        Ok(self.git.current_branch().await?.map(|b| Branch::parse(&b)))
    }

    /// The PR whose branch is checked out
    pub async fn current_pr(&self) -> Result<Option<PrNumber>> {
        Ok(self
            .git
            .current_branch()
            .await?
            .and_then(|b| extract_pr_number(&b).ok()))
    }

    /// The PR named on the command line, or the checked out one
    pub async fn resolve_pr(&self, arg: Option<&str>) -> Result<PrNumber> {
        match arg {
            Some(arg) => parse_pr_argument(arg),
            None => self.current_pr().await?.ok_or(Error::NotOnPrBranch),
        }
    }

    /// Check out the local branch of a PR, which must exist
    pub async fn checkout_pr(&self, pr: PrNumber) -> Result<()> {
        let branch = Branch::Pr(pr);
        self.require_local_tip(&branch).await?;
        self.checkout(&branch).await
    }

    /// Store a free-form tag, such as a ticket id, on the checked out branch.
    pub async fn tag_current_branch(&self, tag: &str) -> Result<Branch> {
        let branch = self.current_branch().await?.ok_or_else(|| {
            Error::InvalidArgument("HEAD is detached, check out the branch to tag".to_string())
        })?;
        let mut state = self.store.get_state(&branch)?;
        state.tag = tag.trim().to_string();
        self.store.save_state(&branch, &state)?;
        Ok(branch)
    }

    /// Check out a branch, reporting the move
    pub async fn checkout(&self, branch: &Branch) -> Result<()> {
        self.git.checkout(&branch.local_name()).await?;
        self.emit(StackEvent::CheckedOut {
            branch: branch.clone(),
        })
        .await;
        Ok(())
    }

    pub(crate) async fn emit(&self, event: StackEvent) {
        self.progress.on_event(&event).await;
    }

    pub(crate) async fn say(&self, message: &str) {
        self.progress.on_message(message).await;
    }
}
