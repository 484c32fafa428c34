//! Rebase operations
//!
//! A silent rebase never leaves the working tree mid-rebase: on failure it is
//! aborted before returning. Interactive variants hand the terminal to the
//! user; only [`GitRepo::rebase_interactive`] may leave an unfinished rebase
//! behind.

use super::GitRepo;
use crate::error::{Error, Result};
use tracing::{debug, warn};

impl GitRepo {
    /// Replay the commits after `upstream` onto `onto` without user interaction.
    ///
    /// Returns `false` when the rebase hit a conflict and was aborted. Fails
    /// with [`Error::Internal`] if the abort itself fails, since the working
    /// tree is then in an unknown state.
    pub async fn rebase_onto_silently(&self, onto: &str, upstream: &str) -> Result<bool> {
        let output = self
            .run_unchecked(&["rebase", "--quiet", "--onto", onto, upstream])
            .await?;
        if output.status.success() {
            return Ok(true);
        }

        debug!(
            onto,
            upstream,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "silent rebase failed, aborting"
        );
        self.abort_rebase(onto).await?;
        Ok(false)
    }

    /// Let the user pick which commits after `upstream` to replay onto `onto`.
    ///
    /// Returns `false` when the rebase did not complete; whatever git left
    /// behind is aborted first.
    pub async fn pick_onto_interactive(&self, onto: &str, upstream: &str) -> Result<bool> {
        if self
            .run_interactive(&["rebase", "--interactive", "--onto", onto, upstream])
            .await?
        {
            return Ok(true);
        }

        // an emptied todo list makes git give up without stopping
        if self.rebase_in_progress().await? {
            self.abort_rebase(onto).await?;
        }
        Ok(false)
    }

    /// Interactive rebase onto `onto`, attached to the user's terminal.
    ///
    /// Returns `false` when git exits before the rebase completed.
    pub async fn rebase_interactive(&self, onto: &str) -> Result<bool> {
        self.run_interactive(&["rebase", "--no-fork-point", "-i", onto])
            .await
    }

    /// Whether a rebase is stopped in this working tree
    pub async fn rebase_in_progress(&self) -> Result<bool> {
        for dir in ["rebase-merge", "rebase-apply"] {
            if self.git_path(dir).await?.exists() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn abort_rebase(&self, onto: &str) -> Result<()> {
        let abort = self.run_unchecked(&["rebase", "--abort"]).await?;
        if !abort.status.success() {
            warn!("rebase --abort failed");
            return Err(Error::Internal(format!(
                "tried to abort the rebase onto {onto} but failed: {}",
                String::from_utf8_lossy(&abort.stderr).trim()
            )));
        }
        Ok(())
    }
}
