//! Task queue and worker pool.
//!
//! Tasks are the unit of retry: a worker drains the shared queue, runs each
//! task body under its retry policy and a wall-clock timeout, and records
//! permanent failures instead of raising them. Bodies are idempotent, so an
//! abandoned (timed-out) task is safe to run again from scratch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::context::PipelineContext;
use super::retry::{RetryPolicy, TaskFailure, run_with_retry};
use super::{analyze, deliver, ingest, respond};
use crate::account::AccountId;
use crate::draft::ResponseTone;
use crate::review::ReviewId;

/// One unit of pipeline work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Fetch and ingest new messages for an account.
    Ingest(AccountId),
    /// Run the analysis workflow for a review.
    Analyze(ReviewId),
    /// Dispatch notifications for a processed review.
    Notify(ReviewId),
    /// Generate (or regenerate) response drafts for a review.
    Drafts {
        /// Review to draft responses for.
        review: ReviewId,
        /// Tone override for regeneration; profile default when absent.
        tone_override: Option<ResponseTone>,
    },
}

/// Receiving half of the shared queue.
pub type TaskReceiver = mpsc::UnboundedReceiver<Task>;

/// Cloneable producer handle to the shared task queue.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskQueue {
    /// Creates the queue, returning the producer handle and the receiver
    /// the worker pool drains.
    #[must_use]
    pub fn channel() -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueues a task. Silently drops when the pool has shut down — tasks
    /// are re-derivable from storage on the next scheduler pass.
    pub fn enqueue(&self, task: Task) {
        if self.tx.send(task.clone()).is_err() {
            debug!("Task queue closed, dropped {task:?}");
        }
    }
}

/// Runs `count` workers until shutdown, draining the shared receiver.
pub async fn run_workers(
    ctx: Arc<PipelineContext>,
    rx: TaskReceiver,
    count: usize,
    task_timeout: Duration,
    shutdown: CancellationToken,
) {
    let rx = Arc::new(Mutex::new(rx));
    let mut handles = Vec::with_capacity(count);

    for worker_id in 0..count {
        let ctx = ctx.clone();
        let rx = rx.clone();
        let shutdown = shutdown.clone();

        handles.push(tokio::spawn(async move {
            info!("Worker {worker_id} started");
            loop {
                let task = {
                    let mut rx = rx.lock().await;
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        task = rx.recv() => task,
                    }
                };

                let Some(task) = task else { break };
                execute(&ctx, task, task_timeout).await;
            }
            info!("Worker {worker_id} stopped");
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker panicked: {e}");
        }
    }
}

/// Runs one task under its timeout and retry policy.
pub async fn execute(ctx: &PipelineContext, task: Task, timeout: Duration) {
    debug!("Executing {task:?}");

    let run = run_task(ctx, &task);
    if tokio::time::timeout(timeout, run).await.is_err() {
        // No cooperative cancellation reaches in-flight provider calls; the
        // task is abandoned and safe to re-run because bodies are
        // idempotent.
        error!("Task {task:?} exceeded {}s, abandoned", timeout.as_secs());
    }
}

async fn run_task(ctx: &PipelineContext, task: &Task) {
    match task {
        Task::Ingest(account_id) => {
            let outcome = run_with_retry(
                &RetryPolicy::ingestion(),
                crate::Error::is_retryable,
                || ingest::ingest_account(ctx, *account_id),
            )
            .await;

            match outcome {
                Ok(report) => debug!("Ingestion for account {account_id}: {report:?}"),
                Err(failure) => {
                    error!("Ingestion for account {account_id} permanently failed: {failure}");
                }
            }
        }
        Task::Analyze(review_id) => {
            let outcome = run_with_retry(
                &RetryPolicy::analysis(),
                analyze::is_retryable,
                || analyze::analyze_review(ctx, *review_id),
            )
            .await;

            if let Err(failure) = outcome {
                error!("Analysis for review {review_id} permanently failed: {failure}");
                if let TaskFailure::Exhausted { last, .. } = failure {
                    // Unprocessed-forever is disallowed: record the failure
                    // on the review so downstream consumers see a terminal
                    // state instead of a stuck one.
                    if let Err(e) = ctx.reviews.mark_failed(*review_id, &last.to_string()).await {
                        error!("Could not record analysis failure for {review_id}: {e}");
                    }
                }
            }
        }
        Task::Notify(review_id) => {
            let outcome = run_with_retry(
                &RetryPolicy::notification(),
                crate::Error::is_retryable,
                || deliver::deliver_notification(ctx, *review_id),
            )
            .await;

            match outcome {
                Ok(summary) => debug!(
                    "Notification for review {review_id}: {}/{} channels succeeded",
                    summary.succeeded, summary.attempted
                ),
                Err(failure) => {
                    error!("Notification for review {review_id} permanently failed: {failure}");
                }
            }
        }
        Task::Drafts {
            review,
            tone_override,
        } => {
            let outcome = run_with_retry(
                &RetryPolicy::drafting(),
                crate::Error::is_retryable,
                || respond::generate_drafts(ctx, *review, *tone_override),
            )
            .await;

            match outcome {
                Ok(count) => debug!("Stored {count} drafts for review {review}"),
                Err(failure) => {
                    error!("Draft generation for review {review} permanently failed: {failure}");
                }
            }
        }
    }
}
