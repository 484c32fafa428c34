//! Reconciliation pipeline
//!
//! Checks every local PR against the remote and cleans up the ones that are
//! gone or no longer open. Work flows through bounded channels:
//!
//! ```text
//! generator ──► source ──┬──► worker 0 ──► out 0 ──┐
//!                        ├──► worker 1 ──► out 1 ──┼──► fan-in ──► results
//!                        └──► worker N ──► out N ──┘
//! ```
//!
//! Each PR produces exactly one [`ReconcileResult`]; a failure is reported in
//! that PR's result and does not stop the others. A check that panics is
//! reported as a failure of that PR. Cleanup itself is serialized by the
//! stack's cascade lock.
//!
//! Every stage runs in one [`JoinSet`] that [`Reconciler::run`] joins after
//! the results are drained, logging any stage that died.

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::stack::Stack;
use crate::types::{Branch, PrNumber, PrState};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Channel buffer size between pipeline stages.
const CHANNEL_BUFFER: usize = 16;

/// Why a PR was cleaned up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanReason {
    /// Its branch no longer exists on the remote
    RemoteBranchGone,
    /// The PR is closed or merged
    NotOpen(PrState),
}

/// What reconciliation did with a PR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// The PR is open and was left alone
    Kept,
    /// The PR was cleaned up
    Cleaned(CleanReason),
}

/// Outcome for one PR
#[derive(Debug)]
pub struct ReconcileResult {
    /// PR that was checked
    pub pr: PrNumber,
    /// What happened, or why checking failed
    pub outcome: Result<ReconcileAction>,
}

/// Runs the reconciliation pipeline over a set of PRs
pub struct Reconciler {
    stack: Arc<Stack>,
    platform: Arc<dyn PlatformService>,
    workers: usize,
}

impl Reconciler {
    /// Pipeline sized to the available parallelism
    pub fn new(stack: Arc<Stack>, platform: Arc<dyn PlatformService>) -> Self {
        let workers = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self {
            stack,
            platform,
            workers,
        }
    }

    /// Use exactly `workers` workers (at least one)
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run the pipeline to completion and collect every result.
    ///
    /// Unless the run is cancelled, every PR gets exactly one result: a PR
    /// that a dead stage never reported is returned as a [`Error::Task`]
    /// failure.
    pub async fn run(&self, prs: Vec<PrNumber>, cancel: CancellationToken) -> Vec<ReconcileResult> {
        let (stages, mut rx) = self.spawn_stages(prs.clone(), cancel.clone());
        let mut results = Vec::with_capacity(prs.len());
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        let failed = supervise(stages).await;

        if !cancel.is_cancelled() {
            for pr in prs {
                if results.iter().all(|r| r.pr != pr) {
                    warn!(%pr, failed, "no result for PR");
                    results.push(ReconcileResult {
                        pr,
                        outcome: Err(Error::Task(format!("{pr} was never checked"))),
                    });
                }
            }
        }
        results
    }

    #[instrument(skip(self, cancel))]
    fn spawn_stages(
        &self,
        prs: Vec<PrNumber>,
        cancel: CancellationToken,
    ) -> (JoinSet<()>, mpsc::Receiver<ReconcileResult>) {
        let workers = self.workers.min(prs.len()).max(1);
        debug!(workers, "starting reconciliation");

        let mut stages = JoinSet::new();
        let (source_tx, source_rx) = mpsc::channel(CHANNEL_BUFFER);
        stages.spawn(generate(prs, source_tx, cancel.clone()));

        let source = Arc::new(Mutex::new(source_rx));
        let mut outputs = Vec::with_capacity(workers);
        for id in 0..workers {
            let (out_tx, out_rx) = mpsc::channel(CHANNEL_BUFFER);
            outputs.push(out_rx);
            stages.spawn(work(
                id,
                Arc::clone(&self.stack),
                Arc::clone(&self.platform),
                Arc::clone(&source),
                out_tx,
                cancel.clone(),
            ));
        }

        let (results_tx, results_rx) = mpsc::channel(CHANNEL_BUFFER);
        stages.spawn(fan_in(outputs, results_tx, cancel));
        (stages, results_rx)
    }
}

/// Join every stage, logging the ones that died; returns how many did.
async fn supervise(mut stages: JoinSet<()>) -> usize {
    let mut failed = 0;
    while let Some(joined) = stages.join_next().await {
        if let Err(e) = joined {
            failed += 1;
            error!(error = %e, "reconciliation stage failed");
        }
    }
    debug!(failed, "reconciliation finished");
    failed
}

async fn generate(prs: Vec<PrNumber>, tx: mpsc::Sender<PrNumber>, cancel: CancellationToken) {
    for pr in prs {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(pr) => if sent.is_err() { break },
        }
    }
}

async fn work(
    id: usize,
    stack: Arc<Stack>,
    platform: Arc<dyn PlatformService>,
    source: Arc<Mutex<mpsc::Receiver<PrNumber>>>,
    out: mpsc::Sender<ReconcileResult>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            pr = async { source.lock().await.recv().await } => pr,
        };
        let Some(pr) = next else { break };

        debug!(worker = id, %pr, "reconciling");
        let check = {
            let stack = Arc::clone(&stack);
            let platform = Arc::clone(&platform);
            tokio::spawn(async move { reconcile_one(&stack, platform.as_ref(), pr).await })
        };
        let outcome = check.await.unwrap_or_else(|e| {
            Err(Error::Task(format!("checking {pr} did not finish: {e}")))
        });
        if let Err(e) = &outcome {
            warn!(%pr, error = %e, "reconciliation failed");
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = out.send(ReconcileResult { pr, outcome }) => if sent.is_err() { break },
        }
    }
}

async fn fan_in(
    outputs: Vec<mpsc::Receiver<ReconcileResult>>,
    results: mpsc::Sender<ReconcileResult>,
    cancel: CancellationToken,
) {
    let mut forwarders = JoinSet::new();
    for mut rx in outputs {
        let results = results.clone();
        let cancel = cancel.clone();
        forwarders.spawn(async move {
            while let Some(result) = rx.recv().await {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    sent = results.send(result) => if sent.is_err() { break },
                }
            }
        });
    }
    drop(results);
    while forwarders.join_next().await.is_some() {}
}

/// Decide whether one PR is still alive, cleaning it up if not.
async fn reconcile_one(
    stack: &Stack,
    platform: &dyn PlatformService,
    pr: PrNumber,
) -> Result<ReconcileAction> {
    let branch = Branch::Pr(pr);
    if stack.remote_tip(&branch).await?.is_none() {
        info!(%pr, "remote branch gone, cleaning up");
        stack.cleanup_after_merge(pr).await?;
        return Ok(ReconcileAction::Cleaned(CleanReason::RemoteBranchGone));
    }

    let details = platform.get_pr_details(pr).await?;
    if details.state != PrState::Open {
        info!(%pr, state = %details.state, "PR no longer open, cleaning up");
        stack.cleanup_after_merge(pr).await?;
        return Ok(ReconcileAction::Cleaned(CleanReason::NotOpen(details.state)));
    }

    Ok(ReconcileAction::Kept)
}
