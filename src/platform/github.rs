//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    MergeMethod, MergeResult, PlatformConfig, PrNumber, PrState, PullRequest,
    PullRequestDetails, Sha,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// GitHub service using octocrab
///
/// Every request runs under the configured timeout. CI results are read
/// with plain REST calls since octocrab has no combined-status endpoint.
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
    timeout: Duration,
    rest: RestClient,
}

/// Minimal authenticated client for endpoints octocrab lacks
struct RestClient {
    http: Client,
    token: String,
    /// `https://api.github.com` or `https://<host>/api/v3`
    api_root: String,
}

impl RestClient {
    /// GET `{api_root}/repos/{owner}/{repo}/commits/{git_ref}/{endpoint}`.
    ///
    /// `None` when GitHub answers with an error status, which happens when
    /// the repository has no CI of that kind.
    async fn commit_resource<T: DeserializeOwned>(
        &self,
        repo: &PlatformConfig,
        git_ref: &str,
        endpoint: &str,
    ) -> Result<Option<T>> {
        let url = format!(
            "{}/repos/{}/{}/commits/{git_ref}/{endpoint}",
            self.api_root, repo.owner, repo.repo
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("GET {endpoint} for {git_ref}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, endpoint, "no CI data");
            return Ok(None);
        }
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| Error::GitHubApi(format!("malformed {endpoint} response: {e}")))
    }
}

const API_VERSION: &str = "2022-11-28";

/// Legacy commit statuses, combined
#[derive(Deserialize)]
struct CombinedStatus {
    state: String,
    total_count: u32,
}

impl CombinedStatus {
    fn passing(&self) -> bool {
        self.total_count == 0 || self.state == "success"
    }
}

#[derive(Deserialize)]
struct CheckRuns {
    check_runs: Vec<CheckRun>,
}

#[derive(Deserialize)]
struct CheckRun {
    status: String,
    conclusion: Option<String>,
}

impl CheckRuns {
    fn passing(&self) -> bool {
        self.check_runs.iter().all(|run| {
            run.status == "completed"
                && matches!(
                    run.conclusion.as_deref(),
                    Some("success" | "neutral" | "skipped")
                )
        })
    }
}

impl GitHubService {
    /// Connect to github.com, or to the Enterprise instance at `host`
    pub fn new(
        token: &str,
        owner: String,
        repo: String,
        host: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_root = host
            .as_ref()
            .map_or_else(|| "https://api.github.com".to_string(), |h| format!("https://{h}/api/v3"));

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if host.is_some() {
            builder = builder
                .base_uri(api_root.as_str())
                .map_err(|e| Error::GitHubApi(format!("invalid GitHub host: {e}")))?;
        }
        let client = builder.build()?;

        let http = Client::builder()
            .user_agent(concat!("opp/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::GitHubApi(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: PlatformConfig { owner, repo, host },
            timeout,
            rest: RestClient {
                http,
                token: token.to_string(),
                api_root,
            },
        })
    }

    async fn timed<T>(&self, what: &str, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("GitHub {what}")))?
    }
}

/// Helper to convert octocrab PR to our `PullRequest` type
fn pr_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: PrNumber(pr.number),
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        base_ref: pr.base.ref_field.clone(),
        head_ref: pr.head.ref_field.clone(),
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        is_draft: pr.draft.unwrap_or(false),
    }
}

/// GitHub answers 409 when the head moved since the given sha.
fn is_head_conflict(err: &octocrab::Error) -> bool {
    matches!(err, octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 409)
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn create_pr_with_options(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: Option<&str>,
        draft: bool,
    ) -> Result<PullRequest> {
        debug!(head, base, draft, "creating PR");
        let pr = self
            .timed("create PR", async {
                let pulls = self.client.pulls(&self.config.owner, &self.config.repo);
                let mut builder = pulls.create(title, head, base).draft(draft);
                if let Some(body_text) = body {
                    builder = builder.body(body_text);
                }
                Ok(builder.send().await?)
            })
            .await?;

        let result = pr_from_octocrab(&pr);
        debug!(pr_number = result.number.0, "created PR");
        Ok(result)
    }

    async fn last_issue_number(&self) -> Result<Option<PrNumber>> {
        debug!("fetching last issue number");
        let page = self
            .timed("list issues", async {
                Ok(self
                    .client
                    .issues(&self.config.owner, &self.config.repo)
                    .list()
                    .state(octocrab::params::State::All)
                    .sort(octocrab::params::issues::Sort::Created)
                    .direction(octocrab::params::Direction::Descending)
                    .per_page(1)
                    .send()
                    .await?)
            })
            .await?;

        let last = page.items.first().map(|issue| PrNumber(issue.number));
        debug!(?last, "fetched last issue number");
        Ok(last)
    }

    async fn current_login(&self) -> Result<String> {
        debug!("fetching authenticated user");
        let user = self
            .timed("get user", async { Ok(self.client.current().user().await?) })
            .await?;
        Ok(user.login)
    }

    async fn create_pr_comment(&self, pr: PrNumber, body: &str) -> Result<()> {
        debug!(pr_number = pr.0, "creating PR comment");
        self.timed("create comment", async {
            self.client
                .issues(&self.config.owner, &self.config.repo)
                .create_comment(pr.0, body)
                .await?;
            Ok(())
        })
        .await?;
        debug!(pr_number = pr.0, "created PR comment");
        Ok(())
    }

    async fn get_pr_details(&self, pr: PrNumber) -> Result<PullRequestDetails> {
        debug!(pr_number = pr.0, "getting PR details");

        let details = self
            .timed("get PR", async {
                Ok(self
                    .client
                    .pulls(&self.config.owner, &self.config.repo)
                    .get(pr.0)
                    .await?)
            })
            .await?;

        // Determine PR state from GitHub's state field and merged_at
        let state = match details.state {
            Some(octocrab::models::IssueState::Open) => PrState::Open,
            Some(octocrab::models::IssueState::Closed) if details.merged_at.is_some() => {
                PrState::Merged
            }
            // IssueState is non-exhaustive, so use wildcard for Closed and any future variants
            Some(_) | None => PrState::Closed,
        };

        let mergeable_state = details
            .mergeable_state
            .as_ref()
            .and_then(|s| serde_json::to_value(s).ok())
            .and_then(|v| v.as_str().map(str::to_string));

        let result = PullRequestDetails {
            number: PrNumber(details.number),
            title: details.title.clone().unwrap_or_default(),
            body: details.body.clone(),
            state,
            is_draft: details.draft.unwrap_or(false),
            mergeable: details.mergeable,
            mergeable_state,
            head_ref: details.head.ref_field.clone(),
            head_sha: details.head.sha.clone(),
            base_ref: details.base.ref_field.clone(),
            html_url: details
                .html_url
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        };

        debug!(pr_number = pr.0, state = ?result.state, mergeable = ?result.mergeable, "got PR details");
        Ok(result)
    }

    async fn checks_passing(&self, git_ref: &str) -> Result<bool> {
        self.timed("check CI status", async {
            let statuses: Option<CombinedStatus> = self
                .rest
                .commit_resource(&self.config, git_ref, "status")
                .await?;
            let runs: Option<CheckRuns> = self
                .rest
                .commit_resource(&self.config, git_ref, "check-runs")
                .await?;
            let passing = statuses.is_none_or(|s| s.passing()) && runs.is_none_or(|r| r.passing());
            debug!(git_ref, passing, "CI status");
            Ok(passing)
        })
        .await
    }

    async fn merge_pr(
        &self,
        pr: PrNumber,
        head_sha: &Sha,
        method: MergeMethod,
    ) -> Result<MergeResult> {
        debug!(pr_number = pr.0, %method, sha = head_sha.short(), "merging PR");

        let octocrab_method = match method {
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
            MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
        };

        let result = self
            .timed("merge PR", async {
                self.client
                    .pulls(&self.config.owner, &self.config.repo)
                    .merge(pr.0)
                    .sha(head_sha.as_str())
                    .method(octocrab_method)
                    .send()
                    .await
                    .map_err(|e| {
                        if is_head_conflict(&e) {
                            Error::StaleRemoteTip(pr)
                        } else {
                            Error::GitHubApi(format!("Merge failed: {e}"))
                        }
                    })
            })
            .await?;

        let merge_result = MergeResult {
            merged: result.merged,
            sha: result.sha,
            message: result.message,
        };

        debug!(
            pr_number = pr.0,
            merged = merge_result.merged,
            sha = ?merge_result.sha,
            "merge complete"
        );
        Ok(merge_result)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
