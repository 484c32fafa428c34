//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use opp::error::{Error, Result};
use opp::platform::PlatformService;
use opp::types::{
    MergeMethod, MergeResult, PlatformConfig, PrNumber, PrState, PullRequest, PullRequestDetails,
    Sha,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Runs at the start of every `get_pr_details` call
pub type DetailsHook = Arc<dyn Fn(PrNumber) + Send + Sync>;

/// Call record for `create_pr_with_options`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrCall {
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: Option<String>,
    pub draft: bool,
}

/// Call record for `create_pr_comment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommentCall {
    pub pr: PrNumber,
    pub body: String,
}

/// Call record for `merge_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePrCall {
    pub pr: PrNumber,
    pub head_sha: Sha,
    pub method: MergeMethod,
}

/// Simple mock platform service for testing
///
/// Features:
/// - Issue numbers shared between PRs and "other people's" issues
/// - Call tracking for verification
/// - Configurable PR details, including a queue of successive answers
/// - Error injection for failure path testing
pub struct MockPlatformService {
    config: PlatformConfig,
    last_issue: Mutex<u64>,
    /// Numbers taken by someone else right before our next creates
    stolen: Mutex<usize>,
    details: Mutex<HashMap<PrNumber, PullRequestDetails>>,
    queued_details: Mutex<HashMap<PrNumber, VecDeque<PullRequestDetails>>>,
    merge_responses: Mutex<HashMap<PrNumber, MergeResult>>,
    // Call tracking
    create_pr_calls: Mutex<Vec<CreatePrCall>>,
    create_comment_calls: Mutex<Vec<CreateCommentCall>>,
    get_pr_details_calls: Mutex<Vec<PrNumber>>,
    merge_pr_calls: Mutex<Vec<MergePrCall>>,
    // Error injection
    error_on_create_pr: Mutex<Option<String>>,
    error_on_get_details: Mutex<Option<String>>,
    error_on_merge_pr: Mutex<Option<String>>,
    details_hook: Mutex<Option<DetailsHook>>,
}

impl MockPlatformService {
    /// Create a new mock with the given config
    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            config,
            last_issue: Mutex::new(0),
            stolen: Mutex::new(0),
            details: Mutex::new(HashMap::new()),
            queued_details: Mutex::new(HashMap::new()),
            merge_responses: Mutex::new(HashMap::new()),
            create_pr_calls: Mutex::new(Vec::new()),
            create_comment_calls: Mutex::new(Vec::new()),
            get_pr_details_calls: Mutex::new(Vec::new()),
            merge_pr_calls: Mutex::new(Vec::new()),
            error_on_create_pr: Mutex::new(None),
            error_on_get_details: Mutex::new(None),
            error_on_merge_pr: Mutex::new(None),
            details_hook: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `create_pr_with_options` return an error
    pub fn fail_create_pr(&self, msg: &str) {
        *self.error_on_create_pr.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `get_pr_details` return an error
    pub fn fail_get_details(&self, msg: &str) {
        *self.error_on_get_details.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merge_pr` return an error
    pub fn fail_merge_pr(&self, msg: &str) {
        *self.error_on_merge_pr.lock().unwrap() = Some(msg.to_string());
    }

    /// Run `hook` whenever PR details are requested, e.g. to panic or to
    /// cancel a pipeline in the middle of a run
    pub fn on_get_details(&self, hook: impl Fn(PrNumber) + Send + Sync + 'static) {
        *self.details_hook.lock().unwrap() = Some(Arc::new(hook));
    }

    // === Response setup ===

    /// Pretend the repository's newest issue or PR has this number
    pub fn set_last_issue(&self, n: u64) {
        *self.last_issue.lock().unwrap() = n;
    }

    /// Let someone else open an issue right before each of our next `count` PRs
    pub fn steal_next_numbers(&self, count: usize) {
        *self.stolen.lock().unwrap() = count;
    }

    /// Set the details returned for a PR from now on
    pub fn set_pr_details(&self, details: PullRequestDetails) {
        self.details.lock().unwrap().insert(details.number, details);
    }

    /// Queue a one-off answer for `get_pr_details`, served before the stored details
    pub fn queue_pr_details(&self, details: PullRequestDetails) {
        self.queued_details
            .lock()
            .unwrap()
            .entry(details.number)
            .or_default()
            .push_back(details);
    }

    /// Change the state of a known PR
    pub fn set_pr_state(&self, pr: PrNumber, state: PrState) {
        let mut details = self.details.lock().unwrap();
        let entry = details.entry(pr).or_insert_with(|| make_details(pr));
        entry.state = state;
    }

    /// Set the response for `merge_pr` for a specific PR
    pub fn set_merge_response(&self, pr: PrNumber, result: MergeResult) {
        self.merge_responses.lock().unwrap().insert(pr, result);
    }

    // === Call verification methods ===

    pub fn get_create_pr_calls(&self) -> Vec<CreatePrCall> {
        self.create_pr_calls.lock().unwrap().clone()
    }

    pub fn get_create_comment_calls(&self) -> Vec<CreateCommentCall> {
        self.create_comment_calls.lock().unwrap().clone()
    }

    pub fn get_pr_details_calls(&self) -> Vec<PrNumber> {
        self.get_pr_details_calls.lock().unwrap().clone()
    }

    pub fn get_merge_pr_calls(&self) -> Vec<MergePrCall> {
        self.merge_pr_calls.lock().unwrap().clone()
    }

    pub fn assert_merge_pr_called(&self, pr: PrNumber) {
        let calls = self.merge_pr_calls.lock().unwrap();
        assert!(
            calls.iter().any(|c| c.pr == pr),
            "Expected merge_pr({pr}) to be called, but calls were: {calls:?}"
        );
    }

    pub fn assert_merge_pr_not_called(&self) {
        let calls = self.merge_pr_calls.lock().unwrap();
        assert!(
            calls.is_empty(),
            "Expected merge_pr not to be called, but calls were: {calls:?}"
        );
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn create_pr_with_options(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: Option<&str>,
        draft: bool,
    ) -> Result<PullRequest> {
        if let Some(msg) = self.error_on_create_pr.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }

        self.create_pr_calls.lock().unwrap().push(CreatePrCall {
            head: head.to_string(),
            base: base.to_string(),
            title: title.to_string(),
            body: body.map(str::to_string),
            draft,
        });

        let number = {
            let mut last = self.last_issue.lock().unwrap();
            let mut stolen = self.stolen.lock().unwrap();
            if *stolen > 0 {
                *stolen -= 1;
                *last += 1;
            }
            *last += 1;
            PrNumber(*last)
        };

        let mut details = make_details(number);
        details.title = title.to_string();
        details.body = body.map(str::to_string);
        details.is_draft = draft;
        details.head_ref = head.to_string();
        details.base_ref = base.to_string();
        self.details.lock().unwrap().insert(number, details);

        Ok(PullRequest {
            number,
            html_url: format!("https://github.com/test/repo/pull/{}", number.0),
            base_ref: base.to_string(),
            head_ref: head.to_string(),
            title: title.to_string(),
            is_draft: draft,
        })
    }

    async fn last_issue_number(&self) -> Result<Option<PrNumber>> {
        Ok(PrNumber::new(*self.last_issue.lock().unwrap()))
    }

    async fn current_login(&self) -> Result<String> {
        Ok("tester".to_string())
    }

    async fn create_pr_comment(&self, pr: PrNumber, body: &str) -> Result<()> {
        self.create_comment_calls
            .lock()
            .unwrap()
            .push(CreateCommentCall {
                pr,
                body: body.to_string(),
            });
        Ok(())
    }

    async fn get_pr_details(&self, pr: PrNumber) -> Result<PullRequestDetails> {
        self.get_pr_details_calls.lock().unwrap().push(pr);
        let hook = self.details_hook.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(pr);
        }
        if let Some(msg) = self.error_on_get_details.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }

        if let Some(details) = self
            .queued_details
            .lock()
            .unwrap()
            .get_mut(&pr)
            .and_then(VecDeque::pop_front)
        {
            return Ok(details);
        }
        self.details
            .lock()
            .unwrap()
            .get(&pr)
            .cloned()
            .ok_or_else(|| Error::GitHubApi(format!("PR {pr} not found")))
    }

    async fn checks_passing(&self, _git_ref: &str) -> Result<bool> {
        Ok(true)
    }

    async fn merge_pr(
        &self,
        pr: PrNumber,
        head_sha: &Sha,
        method: MergeMethod,
    ) -> Result<MergeResult> {
        self.merge_pr_calls.lock().unwrap().push(MergePrCall {
            pr,
            head_sha: head_sha.clone(),
            method,
        });

        if let Some(msg) = self.error_on_merge_pr.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }

        let result = self
            .merge_responses
            .lock()
            .unwrap()
            .get(&pr)
            .cloned()
            .unwrap_or(MergeResult {
                merged: true,
                sha: Some(format!("merge_sha_{}", pr.0)),
                message: None,
            });
        if result.merged {
            self.set_pr_state(pr, PrState::Merged);
        }
        Ok(result)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}

/// Details of an open, mergeable PR
pub fn make_details(pr: PrNumber) -> PullRequestDetails {
    PullRequestDetails {
        number: pr,
        title: format!("PR {}", pr.0),
        body: None,
        state: PrState::Open,
        is_draft: false,
        mergeable: Some(true),
        mergeable_state: Some("clean".to_string()),
        head_ref: format!("tester/pr/{}", pr.0),
        head_sha: String::new(),
        base_ref: "master".to_string(),
        html_url: format!("https://github.com/test/repo/pull/{}", pr.0),
    }
}
