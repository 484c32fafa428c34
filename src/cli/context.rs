//! Shared command context for CLI commands
//!
//! Extracts the setup every command repeats: loading the config, opening the
//! stack and, for commands that talk to GitHub, creating the platform service.

use crate::cli::CliProgress;
use crate::cli::style::{Stylize, check, spinner_style};
use indicatif::ProgressBar;
use opp::config::Config;
use opp::error::Result;
use opp::platform::{PlatformService, create_platform_service, parse_repo_info};
use opp::stack::Stack;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Shared context for CLI commands
pub struct CommandContext {
    /// Loaded configuration
    pub config: Config,
    /// Stack engine reporting progress to the terminal
    pub stack: Arc<Stack>,
}

impl CommandContext {
    /// Load the config and open the stack for the working tree at `root`.
    pub fn new(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        let stack = Stack::open(root, config.clone()).with_progress(Arc::new(CliProgress));
        Ok(Self {
            config,
            stack: Arc::new(stack),
        })
    }

    /// Create the GitHub service, using the remote's host for Enterprise.
    pub async fn platform(&self) -> Result<Arc<dyn PlatformService>> {
        let host = self
            .stack
            .git()
            .remote_url()
            .await
            .ok()
            .and_then(|url| parse_repo_info(&url).ok())
            .and_then(|info| info.host);
        let service = create_platform_service(&self.config, host).await?;
        Ok(Arc::from(service))
    }

    /// Fetch the remote behind a spinner.
    pub async fn fetch(&self) -> Result<()> {
        let remote = &self.config.repo.remote;
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("Fetching from {}...", remote.emphasis()));
        spinner.enable_steady_tick(Duration::from_millis(80));

        let result = self.stack.git().fetch().await;
        match &result {
            Ok(()) => {
                spinner.finish_with_message(format!("{} Fetched from {}", check(), remote.emphasis()));
            }
            Err(_) => spinner.finish_and_clear(),
        }
        result
    }
}
