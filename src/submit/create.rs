//! Opening a new PR on top of the existing stack
//!
//! The PR number is predicted before the PR exists so the remote branch can
//! be named `<login>/pr/<n>` up front. If another issue or PR takes that
//! number first, the speculative remote branch is deleted (which closes the
//! misnumbered PR) and the whole step is retried.

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::stack::{BranchingPoint, Stack};
use crate::types::{Branch, CommitInfo, PrNumber, PullRequest, Sha, parse_pr_argument};
use tracing::{debug, info, instrument, warn};

/// Attempts at winning the race for a predicted PR number
pub const MAX_CREATE_ATTEMPTS: usize = 3;

/// Options for creating a PR
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Revision whose commits make up the PR (HEAD when `None`)
    pub revision: Option<String>,
    /// Branch or PR to stack onto instead of the detected one
    pub base: Option<String>,
    /// Open the PR as a draft
    pub draft: bool,
    /// Check out the new PR branch afterwards
    pub checkout: bool,
    /// Pick the commits to include in an interactive rebase
    pub interactive: bool,
    /// Move the PR's commits off the branch HEAD is on
    pub extract: bool,
}

/// A PR opened by [`create_pull_request`]
#[derive(Debug, Clone)]
pub struct CreatedPr {
    /// The PR as reported by GitHub
    pub pr: PullRequest,
    /// Branch the PR is stacked on
    pub ancestor: Branch,
    /// Tip of the new PR branch
    pub tip: Sha,
    /// Whether the new PR branch is now checked out
    pub checked_out: bool,
    /// Branch the PR's commits were removed from
    pub extracted_from: Option<String>,
}

/// Title and body taken from the longest commit message
pub fn title_and_body(commits: &[CommitInfo]) -> (String, String) {
    let Some(commit) = commits.iter().max_by_key(|c| c.message.trim().len()) else {
        return (String::new(), String::new());
    };
    let message = commit.message.trim();
    let (title, body) = message.split_once('\n').unwrap_or((message, ""));
    (title.trim().to_string(), body.trim().to_string())
}

/// Open a PR for the commits between the stack and a revision.
#[instrument(skip(stack, platform))]
pub async fn create_pull_request(
    stack: &Stack,
    platform: &dyn PlatformService,
    options: &CreateOptions,
) -> Result<CreatedPr> {
    let git = stack.git();
    let head = match &options.revision {
        Some(rev) => git
            .resolve_ref(rev)
            .await?
            .ok_or_else(|| Error::InvalidArgument(format!("invalid revision {rev}")))?,
        None => git.head().await?,
    };

    let base_override = match &options.base {
        Some(name) => Some(resolve_base(stack, name).await?),
        None => None,
    };

    let needs_replay = base_override.is_some() || options.interactive;
    if git.has_local_changes().await?
        && (needs_replay
            || options.extract
            || (options.checkout && options.revision.is_some()))
    {
        return Err(Error::DirtyWorkingTree);
    }

    let point = stack.find_branching_point(&head).await?;
    if point.is_existing_pr_tip()
        && let Branch::Pr(pr) = point.ancestor
    {
        return Err(Error::AlreadyAPrBranch(pr));
    }
    if point.new_commits.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{} has no commits that are not already in {}",
            head.short(),
            point.ancestor
        )));
    }

    let initial_branch = git.current_branch().await?;
    let mut checkout = options.checkout || initial_branch.is_none();
    let (point, head) = if needs_replay {
        checkout = true;
        let onto = base_override.unwrap_or_else(|| point.ancestor.clone());
        let replay = Replay {
            onto,
            interactive: options.interactive,
        };
        replay_onto(stack, &point, &head, replay, initial_branch.as_deref()).await?
    } else {
        (point, head)
    };

    let (title, body) = title_and_body(&point.new_commits);
    let request = PrRequest {
        tip: &head,
        ancestor: &point.ancestor,
        title: &title,
        body: &body,
        draft: options.draft,
    };
    let pr = open_pr(stack, platform, &request).await?;
    let number = pr.number;
    let branch = Branch::Pr(number);
    info!(pr = %number, ancestor = %point.ancestor, "created PR");

    git.create_branch(&branch.local_name(), &head).await?;
    stack.set_ancestor(number, point.ancestor.clone())?;
    stack.remember_current_tip(number).await?;
    if let Err(e) = git
        .set_upstream(&branch.local_name(), &stack.remote_name(&point.ancestor))
        .await
    {
        warn!(pr = %number, error = %e, "PR created but could not set its upstream");
    }

    let extracted_from = match initial_branch {
        Some(initial) if options.extract => {
            extract_commits(stack, &point, number, &initial).await?;
            Some(initial)
        }
        _ => None,
    };
    if checkout {
        stack.checkout(&branch).await?;
    }

    Ok(CreatedPr {
        pr,
        ancestor: point.ancestor,
        tip: head,
        checked_out: checkout,
        extracted_from,
    })
}

/// Remove the PR's commits from `initial`, the branch HEAD started on.
///
/// The branch is first rebased onto the PR so commits that were replayed
/// elsewhere line up, then everything after the PR is moved onto the PR's
/// parent. A conflict in either step leaves the branch untouched.
async fn extract_commits(
    stack: &Stack,
    point: &BranchingPoint,
    pr: PrNumber,
    initial: &str,
) -> Result<()> {
    let git = stack.git();
    let Some(first) = point.first_new_commit() else {
        return Ok(());
    };
    let pr_branch = Branch::Pr(pr).local_name();
    let parent = format!("{}^", first.sha);

    git.checkout(initial).await?;
    if !git.rebase_onto_silently(&pr_branch, &pr_branch).await?
        || !git.rebase_onto_silently(&parent, &pr_branch).await?
    {
        return Err(Error::ExtractFailed {
            pr,
            branch: initial.to_string(),
        });
    }
    info!(%pr, branch = initial, commits = point.new_commits.len(), "extracted PR commits");
    stack
        .say(&format!(
            "Moved {} commits from {initial} to {pr_branch}",
            point.new_commits.len()
        ))
        .await;
    Ok(())
}

/// Decode `--base`, which must name an existing branch or PR.
async fn resolve_base(stack: &Stack, name: &str) -> Result<Branch> {
    let branch = match parse_pr_argument(name) {
        Ok(pr) => Branch::Pr(pr),
        Err(_) => Branch::Base(name.to_string()),
    };
    let target = stack.rebase_target(&branch);
    if stack.git().resolve_ref(&target).await?.is_none() {
        return Err(Error::BranchNotFound(target));
    }
    Ok(branch)
}

/// Where and how to replay a PR's commits before opening it
struct Replay {
    onto: Branch,
    /// Let the user pick the commits in an interactive rebase
    interactive: bool,
}

/// Replay the new commits onto `replay.onto`, leaving HEAD detached on the
/// result.
///
/// On conflict the rebase is aborted and the starting ref is checked out
/// again before failing.
async fn replay_onto(
    stack: &Stack,
    point: &BranchingPoint,
    head: &Sha,
    replay: Replay,
    initial_branch: Option<&str>,
) -> Result<(BranchingPoint, Sha)> {
    let git = stack.git();
    let target = stack.rebase_target(&replay.onto);
    let Some(first) = point.first_new_commit() else {
        return Err(Error::Internal("replaying an empty commit range".to_string()));
    };
    let upstream = format!("{}^", first.sha);
    let restore = initial_branch.unwrap_or(head.as_str());

    git.detach(head.as_str()).await?;
    let replayed = if replay.interactive {
        stack.say("Choose the commits to include in this PR").await;
        git.pick_onto_interactive(&target, &upstream).await?
    } else {
        stack
            .say(&format!(
                "Rebasing {} commits on top of {target}",
                point.new_commits.len()
            ))
            .await;
        git.rebase_onto_silently(&target, &upstream).await?
    };
    if !replayed {
        git.checkout(restore).await?;
        if replay.interactive {
            return Err(Error::InvalidArgument(format!(
                "one of the commits you chose cannot be replayed cleanly on {target}"
            )));
        }
        let shas: Vec<&str> = point.new_commits.iter().map(|c| c.sha.short()).collect();
        return Err(Error::InvalidArgument(format!(
            "one of these commits cannot be replayed cleanly on {target}:\n  - {}",
            shas.join("\n  - ")
        )));
    }

    let new_head = git.head().await?;
    let new_commits = git.commits_between(&target, new_head.as_str()).await?;
    debug!(head = new_head.short(), commits = new_commits.len(), "replayed commits");
    if new_commits.is_empty() {
        git.checkout(restore).await?;
        return Err(Error::InvalidArgument(format!(
            "no commits left to open a PR with on top of {target}"
        )));
    }
    Ok((
        BranchingPoint {
            ancestor: replay.onto,
            new_commits,
        },
        new_head,
    ))
}

struct PrRequest<'a> {
    tip: &'a Sha,
    ancestor: &'a Branch,
    title: &'a str,
    body: &'a str,
    draft: bool,
}

/// Create the PR, retrying when the predicted number is taken.
async fn open_pr(
    stack: &Stack,
    platform: &dyn PlatformService,
    request: &PrRequest<'_>,
) -> Result<PullRequest> {
    for attempt in 1..=MAX_CREATE_ATTEMPTS {
        match open_pr_once(stack, platform, request).await {
            Err(Error::LostPrCreationRace(predicted)) => {
                warn!(%predicted, attempt, "number taken while creating PR, retrying");
                stack
                    .say(&format!("Oops, {predicted} was taken, deleting its branch"))
                    .await;
                delete_speculative_branch(stack, predicted).await;
            }
            other => return other,
        }
    }
    Err(Error::LostPrCreationRaceRepeatedly)
}

async fn open_pr_once(
    stack: &Stack,
    platform: &dyn PlatformService,
    request: &PrRequest<'_>,
) -> Result<PullRequest> {
    let predicted = platform
        .last_issue_number()
        .await?
        .map_or(PrNumber(1), PrNumber::next);
    let head_branch = stack.remote_name(&Branch::Pr(predicted));
    let base_branch = stack.remote_name(request.ancestor);
    debug!(%predicted, head = %head_branch, base = %base_branch, "creating PR");

    stack.git().push_force(request.tip, &head_branch).await?;
    let pr = match platform
        .create_pr_with_options(
            &head_branch,
            &base_branch,
            request.title,
            Some(request.body),
            request.draft,
        )
        .await
    {
        Ok(pr) => pr,
        Err(e) => {
            delete_speculative_branch(stack, predicted).await;
            return Err(e);
        }
    };

    if pr.number != predicted {
        return Err(Error::LostPrCreationRace(predicted));
    }
    Ok(pr)
}

/// Best-effort removal of a remote branch pushed for a predicted number.
async fn delete_speculative_branch(stack: &Stack, predicted: PrNumber) {
    let remote = stack.remote_name(&Branch::Pr(predicted));
    if let Err(e) = stack.git().delete_remote_branch(&remote).await {
        warn!(branch = %remote, error = %e, "could not delete speculative remote branch");
    }
}
