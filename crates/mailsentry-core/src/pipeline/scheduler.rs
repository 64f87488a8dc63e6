//! Periodic scheduler.
//!
//! Every tick, find the accounts whose check interval has elapsed and fan
//! out one ingestion task per due account. The scheduler itself performs no
//! provider I/O; double-dispatch under overlapping ticks is harmless
//! because ingestion dedups on the (account, message) constraint.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::context::PipelineContext;
use super::queue::Task;
use crate::Result;

/// Runs the scheduler loop until shutdown.
pub async fn run_scheduler(
    ctx: Arc<PipelineContext>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut tick = tokio::time::interval(interval);
    info!("Scheduler started (interval: {}s)", interval.as_secs());

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("Scheduler shutting down");
                break;
            }
            _ = tick.tick() => {
                match dispatch_due_accounts(&ctx).await {
                    Ok(dispatched) if dispatched > 0 => {
                        info!("Dispatched ingestion for {dispatched} due accounts");
                    }
                    Ok(_) => {}
                    Err(e) => error!("Scheduler pass failed: {e}"),
                }
            }
        }
    }
}

/// One scheduler pass: enqueue ingestion for every due active account.
///
/// # Errors
///
/// Returns an error if the account listing fails.
pub async fn dispatch_due_accounts(ctx: &PipelineContext) -> Result<usize> {
    let now = Utc::now();
    let accounts = ctx.accounts.list_active().await?;

    let mut dispatched = 0;
    for account in accounts {
        if account.is_due(now) {
            ctx.queue.enqueue(Task::Ingest(account.id));
            dispatched += 1;
        }
    }

    Ok(dispatched)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::TestHarness;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn never_checked_accounts_are_dispatched() {
        let mut harness = TestHarness::new().await;
        let account = harness.connect_account("inbox@example.com").await;

        let dispatched = dispatch_due_accounts(&harness.ctx).await.unwrap();
        assert_eq!(dispatched, 1);
        assert_eq!(harness.drain_tasks(), vec![Task::Ingest(account.id)]);
    }

    #[tokio::test]
    async fn recently_checked_accounts_are_skipped() {
        let mut harness = TestHarness::new().await;
        let account = harness.connect_account("inbox@example.com").await;
        harness
            .ctx
            .accounts
            .advance_checkpoint(account.id, Utc::now() - ChronoDuration::minutes(1))
            .await
            .unwrap();

        let dispatched = dispatch_due_accounts(&harness.ctx).await.unwrap();
        assert_eq!(dispatched, 0);
        assert!(harness.drain_tasks().is_empty());
    }

    #[tokio::test]
    async fn overdue_accounts_are_dispatched() {
        let mut harness = TestHarness::new().await;
        let account = harness.connect_account("inbox@example.com").await;
        harness
            .ctx
            .accounts
            .advance_checkpoint(account.id, Utc::now() - ChronoDuration::minutes(30))
            .await
            .unwrap();

        let dispatched = dispatch_due_accounts(&harness.ctx).await.unwrap();
        assert_eq!(dispatched, 1);
        assert_eq!(harness.drain_tasks(), vec![Task::Ingest(account.id)]);
    }

    #[tokio::test]
    async fn deactivated_accounts_are_never_dispatched() {
        let mut harness = TestHarness::new().await;
        let account = harness.connect_account("inbox@example.com").await;
        harness.ctx.accounts.deactivate(account.id).await.unwrap();

        let dispatched = dispatch_due_accounts(&harness.ctx).await.unwrap();
        assert_eq!(dispatched, 0);
        assert!(harness.drain_tasks().is_empty());
    }
}
