//! Platform service construction

use crate::auth::get_github_auth;
use crate::config::Config;
use crate::error::Result;
use crate::platform::{GitHubService, PlatformService};
use tracing::debug;

/// Build the GitHub service for a configured repository.
///
/// `host` is the GitHub Enterprise host, `None` for github.com.
pub async fn create_platform_service(
    config: &Config,
    host: Option<String>,
) -> Result<Box<dyn PlatformService>> {
    let (owner, repo) = config.owner_and_name()?;
    let auth = get_github_auth(config, host.as_deref()).await?;
    debug!(owner, repo, source = ?auth.source, "creating GitHub service");

    let service = GitHubService::new(
        &auth.token,
        owner.to_string(),
        repo.to_string(),
        host,
        config.timeout(),
    )?;
    Ok(Box::new(service))
}
