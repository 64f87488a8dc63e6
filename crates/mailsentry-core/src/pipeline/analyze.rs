//! Analysis task.
//!
//! Loads the review, re-fetches the message body, runs the workflow at the
//! subscriber's entitled depth, persists the outcome, and fans out to
//! notification and draft generation.

use tracing::{error, info, warn};

use super::context::PipelineContext;
use super::queue::Task;
use crate::error::{Error, Result};
use crate::review::{Priority, ReviewId, Sentiment};

/// Retry predicate for analysis runs.
///
/// Anything from the provider that is not an auth failure is worth another
/// attempt (a missing or half-synced message often resolves itself); auth
/// failures and missing rows are terminal for this task.
#[must_use]
pub fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Provider(e) => !e.is_auth(),
        _ => false,
    }
}

/// Runs analysis for one review.
///
/// Idempotent: an already-processed review is a no-op, so re-delivery of
/// the task (or an overlapping retry) cannot double-process.
///
/// # Errors
///
/// Returns provider errors for the caller's retry policy; auth failures
/// are handled internally by deactivating the account.
pub async fn analyze_review(ctx: &PipelineContext, review_id: ReviewId) -> Result<()> {
    let Some(review) = ctx.reviews.get(review_id).await? else {
        return Err(Error::ReviewNotFound(review_id));
    };

    if review.is_processed {
        info!("Review {review_id} already processed, skipping");
        return Ok(());
    }

    let Some(account) = ctx.accounts.get(review.account_id).await? else {
        return Err(Error::AccountNotFound(review.account_id));
    };
    let Some(subscriber) = ctx.subscribers.get(account.subscriber_id).await? else {
        return Err(Error::SubscriberNotFound(account.subscriber_id));
    };

    // Fetch the message body; bodies are not cached on the review row.
    let review_text = match ctx.mailbox.fetch_detail(&account, &review.message_id).await {
        Ok(detail) if !detail.body_text.is_empty() => detail.body_text,
        Ok(_) => {
            warn!("No body text for review {review_id}, analyzing the subject");
            review.subject.clone()
        }
        Err(e) if e.is_auth() => {
            error!(
                "Auth failure fetching message for review {review_id}, deactivating {}: {e}",
                account.email
            );
            ctx.accounts.deactivate(account.id).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let analysis = if subscriber.plan.full_analysis() {
        ctx.analyzer.analyze(&review_text, &review.subject).await
    } else {
        ctx.analyzer.analyze_basic(&review_text, &review.subject).await
    };

    ctx.reviews.store_analysis(review_id, &analysis.to_update()).await?;
    info!(
        "Stored analysis for review {review_id}: sentiment={}, priority={}",
        analysis.sentiment.as_str(),
        analysis.priority.as_str()
    );

    // Usage counters are best-effort; never block the pipeline on them.
    ctx.usage.record_analysis(subscriber.id).await;

    if analysis.sentiment == Sentiment::Negative || analysis.priority == Priority::Critical {
        ctx.queue.enqueue(Task::Notify(review_id));
    }

    if subscriber.plan.draft_variant_limit() > 0 {
        ctx.queue.enqueue(Task::Drafts {
            review: review_id,
            tone_override: None,
        });
    }

    Ok(())
}
