//! Ingestion worker.
//!
//! For one account: fetch messages received after the checkpoint, create a
//! review per genuinely new message, enqueue analysis for each, and advance
//! the checkpoint once at the end. Re-runs are harmless: the unique
//! (account, message) constraint turns duplicates into skips.

use chrono::Utc;
use tracing::{error, info, warn};

use super::context::PipelineContext;
use super::queue::Task;
use crate::account::AccountId;
use crate::error::{Error, Result};
use crate::review::NewReview;

/// What one ingestion run did.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Messages fetched from the provider.
    pub fetched: usize,
    /// Reviews created.
    pub created: usize,
    /// Messages skipped as already ingested.
    pub skipped: usize,
    /// Per-message failures (logged, not fatal).
    pub message_errors: usize,
    /// Whether the run deactivated the account on an auth failure.
    pub deactivated: bool,
}

/// Runs ingestion for one account.
///
/// Error routing: auth failures deactivate the account, alert the
/// subscriber, and return a terminal-but-handled outcome (no retry);
/// retryable provider errors propagate so the caller's retry policy backs
/// off and re-runs; per-message failures are logged and skipped without
/// aborting the page. The checkpoint advances only after the page loop, so
/// a crash mid-page re-fetches and dedups rather than losing messages.
///
/// # Errors
///
/// Returns the provider error for retryable failures, or storage errors.
pub async fn ingest_account(ctx: &PipelineContext, account_id: AccountId) -> Result<IngestOutcome> {
    let Some(account) = ctx.accounts.get(account_id).await? else {
        return Err(Error::AccountNotFound(account_id));
    };

    if !account.is_active {
        warn!("Account {} is not active, skipping", account.email);
        return Ok(IngestOutcome::default());
    }

    info!(
        "Checking messages for {} after {:?}",
        account.email, account.last_checked_at
    );

    let page = match ctx
        .mailbox
        .fetch_page(&account, account.last_checked_at, ctx.ingest_page_size)
        .await
    {
        Ok(page) => page,
        Err(e) if e.is_auth() => {
            error!(
                "Auth failure for {}, deactivating account: {e}",
                account.email
            );
            ctx.accounts.deactivate(account.id).await?;
            alert_subscriber(ctx, &account).await;
            return Ok(IngestOutcome {
                deactivated: true,
                ..IngestOutcome::default()
            });
        }
        Err(e) => return Err(e),
    };

    let mut outcome = IngestOutcome {
        fetched: page.len(),
        ..IngestOutcome::default()
    };

    for message in page {
        let new = NewReview {
            account_id: account.id,
            message_id: message.message_id.clone(),
            sender_email: message.sender_email,
            sender_name: message.sender_name,
            subject: message.subject,
            received_at: message.received_at,
        };

        match ctx.reviews.insert_if_new(new).await {
            Ok(Some(review)) => {
                outcome.created += 1;
                ctx.queue.enqueue(Task::Analyze(review.id));
            }
            Ok(None) => outcome.skipped += 1,
            Err(e) => {
                // One malformed message must not sink the rest of the page.
                error!(
                    "Failed to record message {} for {}: {e}",
                    message.message_id, account.email
                );
                outcome.message_errors += 1;
            }
        }
    }

    ctx.accounts.advance_checkpoint(account.id, Utc::now()).await?;

    info!(
        "Completed check for {}: {} new messages from {} fetched",
        account.email, outcome.created, outcome.fetched
    );
    Ok(outcome)
}

/// Best-effort email alert telling the subscriber to reconnect.
async fn alert_subscriber(ctx: &PipelineContext, account: &crate::account::Account) {
    let subscriber = match ctx.subscribers.get(account.subscriber_id).await {
        Ok(Some(subscriber)) => subscriber,
        Ok(None) => return,
        Err(e) => {
            warn!("Could not load subscriber for account alert: {e}");
            return;
        }
    };

    let message = format!(
        "Monitoring for {} stopped because its authorization expired or was \
         revoked. Reconnect the mailbox to resume.",
        account.email
    );
    let summary = ctx
        .dispatcher
        .send_account_alert(&subscriber, "Mailbox disconnected", &message)
        .await;

    if !summary.any_succeeded() {
        warn!(
            "Account alert for {} could not be delivered",
            account.email
        );
    }
}
