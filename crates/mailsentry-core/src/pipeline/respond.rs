//! Draft-generation task.

use tracing::{info, warn};

use super::context::PipelineContext;
use crate::draft::ResponseTone;
use crate::error::{Error, Result};
use crate::review::ReviewId;

/// Generates (or regenerates) response drafts for a processed review.
///
/// Plan-gated: free-tier subscribers are rejected before the generator is
/// invoked. Regeneration fully replaces prior variants. Returns the number
/// of drafts stored.
///
/// # Errors
///
/// Returns an error for missing rows or storage failures.
pub async fn generate_drafts(
    ctx: &PipelineContext,
    review_id: ReviewId,
    tone_override: Option<ResponseTone>,
) -> Result<usize> {
    let Some(review) = ctx.reviews.get(review_id).await? else {
        return Err(Error::ReviewNotFound(review_id));
    };

    if !review.is_processed {
        warn!("Review {review_id} not yet processed, skipping draft generation");
        return Ok(0);
    }

    let Some(account) = ctx.accounts.get(review.account_id).await? else {
        return Err(Error::AccountNotFound(review.account_id));
    };
    let Some(subscriber) = ctx.subscribers.get(account.subscriber_id).await? else {
        return Err(Error::SubscriberNotFound(account.subscriber_id));
    };

    let variant_count = subscriber.plan.draft_variant_limit();
    if variant_count == 0 {
        info!(
            "Plan {} does not include draft generation, skipping review {review_id}",
            subscriber.plan.as_str()
        );
        return Ok(0);
    }

    let profile = ctx.settings.responder_profile(subscriber.id).await?;

    // Text preference: fresh provider body, then stored summary, then
    // subject. A fetch failure here is not fatal; the summary suffices.
    let review_text = match ctx.mailbox.fetch_detail(&account, &review.message_id).await {
        Ok(detail) if !detail.body_text.is_empty() => detail.body_text,
        Ok(_) => fallback_text(&review),
        Err(e) => {
            warn!("Could not fetch message text for drafts: {e}");
            fallback_text(&review)
        }
    };

    let tone = tone_override.unwrap_or(profile.response_tone);
    let drafts = ctx
        .generator
        .generate_with_tone(&review, &review_text, &profile, tone, variant_count)
        .await;

    let stored = ctx.drafts.replace_for_review(review_id, &drafts).await?;
    info!("Stored {} drafts for review {review_id}", stored.len());
    Ok(stored.len())
}

fn fallback_text(review: &crate::review::Review) -> String {
    review
        .summary
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| review.subject.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::TestHarness;
    use crate::review::{AnalysisUpdate, Priority, Sentiment};
    use crate::subscriber::Plan;

    async fn processed_review(harness: &TestHarness) -> ReviewId {
        let account = harness.connect_account("inbox@example.com").await;
        let review = harness.seed_review(account.id, "m1", "Complaint").await;
        harness
            .ctx
            .reviews
            .store_analysis(
                review.id,
                &AnalysisUpdate {
                    sentiment: Sentiment::Negative,
                    priority: Priority::Important,
                    summary: "Customer is unhappy about delivery.".to_string(),
                    problems: vec!["late delivery".to_string()],
                    suggestions: vec![],
                },
            )
            .await
            .unwrap();
        review.id
    }

    #[tokio::test]
    async fn starter_plan_stores_one_variant() {
        let harness = TestHarness::with_plan(Plan::Starter).await;
        let review_id = processed_review(&harness).await;
        harness.mailbox.push_detail("m1", "The delivery took three weeks.");

        let count = generate_drafts(&harness.ctx, review_id, None).await.unwrap();
        assert_eq!(count, 1);

        let drafts = harness.ctx.drafts.list_for_review(review_id).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].variant_number, 1);
    }

    #[tokio::test]
    async fn professional_plan_stores_three_variants() {
        let harness = TestHarness::with_plan(Plan::Professional).await;
        let review_id = processed_review(&harness).await;
        harness.mailbox.push_detail("m1", "The delivery took three weeks.");

        let count = generate_drafts(&harness.ctx, review_id, None).await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn free_plan_is_rejected_before_generation() {
        let harness = TestHarness::with_plan(Plan::Free).await;
        let review_id = processed_review(&harness).await;

        let count = generate_drafts(&harness.ctx, review_id, None).await.unwrap();
        assert_eq!(count, 0);
        assert!(
            harness
                .ctx
                .drafts
                .list_for_review(review_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn regeneration_replaces_and_honors_tone_override() {
        let harness = TestHarness::with_plan(Plan::Professional).await;
        let review_id = processed_review(&harness).await;
        harness.mailbox.push_detail("m1", "The delivery took three weeks.");
        generate_drafts(&harness.ctx, review_id, None).await.unwrap();

        harness.mailbox.push_detail("m1", "The delivery took three weeks.");
        generate_drafts(&harness.ctx, review_id, Some(ResponseTone::Friendly))
            .await
            .unwrap();

        let drafts = harness.ctx.drafts.list_for_review(review_id).await.unwrap();
        assert_eq!(drafts.len(), 3);
        assert!(drafts.iter().all(|d| d.tone == ResponseTone::Friendly));
    }

    #[tokio::test]
    async fn unprocessed_review_is_skipped() {
        let harness = TestHarness::with_plan(Plan::Starter).await;
        let account = harness.connect_account("inbox@example.com").await;
        let review = harness.seed_review(account.id, "m1", "Pending").await;

        let count = generate_drafts(&harness.ctx, review.id, None).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn fetch_failure_falls_back_to_summary() {
        let harness = TestHarness::with_plan(Plan::Starter).await;
        let review_id = processed_review(&harness).await;
        harness.mailbox.push_error(mailsentry_gmail::Error::Temporary(
            "outage".to_string(),
        ));

        // Still succeeds using the stored summary as source text.
        let count = generate_drafts(&harness.ctx, review_id, None).await.unwrap();
        assert_eq!(count, 1);
    }
}
