//! Authentication for GitHub
//!
//! The token comes from the config file, then the environment, then the
//! `gh` CLI.

use crate::config::Config;
use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Environment variables checked for a token, in order
pub const TOKEN_ENV_VARS: [&str; 3] = ["OPP_GITHUB_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"];

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from `github.token` in the config
    Config,
    /// Token from environment variable
    EnvVar,
    /// Token from the gh CLI
    Cli,
}

/// Resolved GitHub credentials
#[derive(Debug, Clone)]
pub struct GitHubAuthConfig {
    /// Personal access token
    pub token: String,
    /// Where the token came from
    pub source: AuthSource,
}

/// Resolve a GitHub token for `host` (None for github.com).
pub async fn get_github_auth(config: &Config, host: Option<&str>) -> Result<GitHubAuthConfig> {
    if let Some(token) = config.github.token.as_deref().filter(|t| !t.is_empty()) {
        debug!("using token from config");
        return Ok(GitHubAuthConfig {
            token: token.to_string(),
            source: AuthSource::Config,
        });
    }

    if let Some(token) = token_from_env(|name| std::env::var(name).ok()) {
        debug!("using token from environment");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::EnvVar,
        });
    }

    if let Some(token) = token_from_gh_cli(host).await {
        debug!("using token from gh CLI");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::Cli,
        });
    }

    Err(Error::Auth(format!(
        "no GitHub token found: set github.token in .opp/config.toml, export {}, or run 'gh auth login'",
        TOKEN_ENV_VARS[1]
    )))
}

/// First non-empty token among [`TOKEN_ENV_VARS`], read through `lookup`.
pub fn token_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
}

async fn token_from_gh_cli(host: Option<&str>) -> Option<String> {
    let mut cmd = Command::new("gh");
    cmd.args(["auth", "token"]);
    if let Some(host) = host {
        cmd.args(["--hostname", host]);
    }
    let output = cmd
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
