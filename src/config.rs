//! Configuration loaded from `.opp/config.toml`
//!
//! The repository file is written by `opp init`. A global file in the user's
//! config directory can hold the login and token shared by every repository.

use crate::error::{Error, Result};
use crate::types::{Branch, MergeMethod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding opp metadata inside a repository.
pub const OPP_DIR: &str = ".opp";

const CONFIG_FILE: &str = "config.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path to the `.opp` directory of a repository.
pub fn opp_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(OPP_DIR)
}

/// Path to the repository config file.
pub fn config_path(repo_root: &Path) -> PathBuf {
    opp_dir(repo_root).join(CONFIG_FILE)
}

/// Path to the global config file, if the platform has a config directory.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("opp").join(CONFIG_FILE))
}

/// Complete opp configuration
///
/// Built once per invocation and passed to every component that needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub account settings
    pub github: GitHubConfig,
    /// Repository settings
    pub repo: RepoConfig,
}

/// `[github]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Login used to namespace remote PR branches
    pub login: String,
    /// Personal access token (falls back to env and the gh CLI)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Deadline for each network call, in seconds
    pub timeout_secs: u64,
    /// Merge method used by `opp merge`
    pub merge_method: MergeMethod,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            login: String::new(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            merge_method: MergeMethod::default(),
        }
    }
}

/// `[repo]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// GitHub repository as `owner/name`
    pub github: String,
    /// Git remote PR branches are pushed to
    pub remote: String,
    /// Base branch PR stacks are rooted on
    pub branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            github: String::new(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
        }
    }
}

impl Config {
    /// Load the repository config, filling account settings from the global file.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = config_path(repo_root);
        let mut config = read_config(&path)?.ok_or_else(|| {
            Error::Config(format!(
                "{} not found, run 'opp init' first",
                path.display()
            ))
        })?;

        if let Some(global_path) = global_config_path()
            && let Some(global) = read_config(&global_path)?
        {
            config.fill_from(global);
        }

        config.validate()?;
        Ok(config)
    }

    /// Save the repository config, creating `.opp/` if needed.
    pub fn save(&self, repo_root: &Path) -> Result<()> {
        let dir = opp_dir(repo_root);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Config(format!("failed to create {}: {e}", dir.display())))?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;
        let path = config_path(repo_root);
        fs::write(&path, format!("# opp configuration\n\n{content}"))
            .map_err(|e| Error::Config(format!("failed to write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Take the login and token from `other` where this config has none.
    fn fill_from(&mut self, other: Self) {
        if self.github.login.is_empty() {
            self.github.login = other.github.login;
        }
        if self.github.token.is_none() {
            self.github.token = other.github.token;
        }
    }

    /// Check the settings every command relies on.
    pub fn validate(&self) -> Result<()> {
        if self.repo.remote.is_empty() {
            return Err(Error::Config("repo.remote is empty".to_string()));
        }
        if self.repo.branch.is_empty() {
            return Err(Error::Config("repo.branch is empty".to_string()));
        }
        if self.github.timeout_secs == 0 {
            return Err(Error::Config("github.timeout_secs must be positive".to_string()));
        }
        self.owner_and_name().map(|_| ())
    }

    /// Split `repo.github` into owner and repository name.
    pub fn owner_and_name(&self) -> Result<(&str, &str)> {
        self.repo
            .github
            .rsplit_once('/')
            .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "repo.github must be 'owner/name', got '{}'",
                    self.repo.github
                ))
            })
    }

    /// Deadline applied to every network call.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_secs)
    }

    /// The branch every stack is rooted on.
    pub fn base_branch(&self) -> Branch {
        Branch::Base(self.repo.branch.clone())
    }
}

fn read_config(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(config))
}
