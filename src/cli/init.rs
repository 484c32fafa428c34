//! Init command - configure opp for a repository

use crate::cli::style::{Stylize, check};
use anstream::println;
use dialoguer::{Input, Select};
use opp::config::{Config, OPP_DIR, config_path};
use opp::error::{Error, Result};
use opp::git::GitRepo;
use opp::platform::{create_platform_service, parse_repo_info};
use opp::types::PlatformConfig;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A remote pointing at GitHub
struct GitHubRemote {
    name: String,
    info: PlatformConfig,
}

/// Run the init command
pub async fn run_init(root: &Path, yes: bool) -> Result<()> {
    let path = config_path(root);
    if path.exists() {
        return Err(Error::Config(format!("{} already exists", path.display())));
    }

    let mut config = Config::default();
    let remote = pick_remote(root, &config, yes).await?;
    config.repo.remote.clone_from(&remote.name);
    config.repo.github = format!("{}/{}", remote.info.owner, remote.info.repo);

    let git = GitRepo::new(root, remote.name.as_str(), config.timeout());
    config.repo.branch = match git.remote_default_branch().await? {
        Some(branch) => branch,
        None if yes => config.repo.branch.clone(),
        None => prompt("Name of the base branch on GitHub", &config.repo.branch)?,
    };

    config.github.login = match create_platform_service(&config, remote.info.host.clone()).await {
        Ok(platform) => platform.current_login().await?,
        Err(e) if yes => return Err(e),
        Err(e) => {
            debug!(error = %e, "cannot reach GitHub, asking for the login");
            prompt("Your GitHub login", "")?
        }
    };

    config.validate()?;
    config.save(root)?;
    exclude_opp_dir(&git).await?;

    println!("{} Wrote {}", check(), path.display().accent());
    println!(
        "  {} {} on {}/{}, PR branches pushed as {}/pr/<n>",
        "Stacking on".muted(),
        config.repo.github.emphasis(),
        config.repo.remote,
        config.repo.branch.accent(),
        config.github.login.accent()
    );
    Ok(())
}

/// Choose the GitHub remote, asking when there are several.
async fn pick_remote(root: &Path, defaults: &Config, yes: bool) -> Result<GitHubRemote> {
    let git = GitRepo::new(root, defaults.repo.remote.as_str(), defaults.timeout());
    let mut candidates = Vec::new();
    for name in git.remotes().await? {
        let url = GitRepo::new(root, name.as_str(), defaults.timeout())
            .remote_url()
            .await?;
        if let Ok(info) = parse_repo_info(&url) {
            candidates.push(GitHubRemote { name, info });
        }
    }

    if candidates.len() > 1 && !yes {
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        let preferred = names
            .iter()
            .position(|n| *n == defaults.repo.remote)
            .unwrap_or_default();
        let chosen = Select::new()
            .with_prompt("Which remote holds the pull requests?")
            .items(&names)
            .default(preferred)
            .interact()
            .map_err(|e| Error::Config(format!("failed to read selection: {e}")))?;
        return Ok(candidates.swap_remove(chosen));
    }

    if candidates.is_empty() {
        return Err(Error::Config("no remote points at a GitHub repository".to_string()));
    }
    let preferred = candidates
        .iter()
        .position(|c| c.name == defaults.repo.remote)
        .unwrap_or_default();
    Ok(candidates.swap_remove(preferred))
}

fn prompt(question: &str, default: &str) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(question);
    if !default.is_empty() {
        input = input.default(default.to_string());
    }
    input
        .interact_text()
        .map(|s| s.trim().to_string())
        .map_err(|e| Error::Config(format!("failed to read input: {e}")))
}

/// Keep `.opp/` out of `git status` without touching tracked files.
async fn exclude_opp_dir(git: &GitRepo) -> Result<()> {
    let exclude = git.git_path("info/exclude").await?;
    let entry = format!("/{OPP_DIR}/");
    let existing = fs::read_to_string(&exclude).unwrap_or_default();
    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }
    if let Some(dir) = exclude.parent() {
        fs::create_dir_all(dir)?;
    }
    let separator = if existing.is_empty() || existing.ends_with('\n') { "" } else { "\n" };
    fs::write(&exclude, format!("{existing}{separator}{entry}\n"))?;
    Ok(())
}
