//! Repository detection from remote URLs

use crate::error::{Error, Result};
use crate::types::PlatformConfig;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const GITHUB_HOST: &str = "github.com";

/// scp-like syntax: `git@github.com:owner/repo.git`
static SCP_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^@/]+@)?([^:/]+):([^/]+)/([^/]+?)(?:\.git)?/?$")
        .unwrap_or_else(|e| unreachable!("invalid regex: {e}"))
});

/// Parse owner and repository from a git remote URL.
pub fn parse_repo_info(remote_url: &str) -> Result<PlatformConfig> {
    let remote_url = remote_url.trim();

    let parsed = Url::parse(remote_url)
        .ok()
        .filter(|url| url.host_str().is_some_and(|h| !h.is_empty()));

    let (host, owner, repo) = if let Some(url) = parsed {
        let host = url.host_str().unwrap_or_default().to_string();
        let mut segments = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(unparseable(remote_url));
        }
        let repo = segments.pop().unwrap_or_default().to_string();
        let owner = segments.pop().unwrap_or_default().to_string();
        (host, owner, repo)
    } else if let Some(caps) = SCP_LIKE.captures(remote_url) {
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string())
    } else {
        return Err(unparseable(remote_url));
    };

    let repo = repo.strip_suffix(".git").unwrap_or(&repo).to_string();
    if owner.is_empty() || repo.is_empty() {
        return Err(unparseable(remote_url));
    }

    Ok(PlatformConfig {
        owner,
        repo,
        host: (host != GITHUB_HOST).then_some(host),
    })
}

fn unparseable(remote_url: &str) -> Error {
    Error::Config(format!(
        "cannot determine GitHub repository from remote URL '{remote_url}'"
    ))
}
