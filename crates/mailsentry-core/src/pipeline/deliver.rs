//! Notification task.

use tracing::info;

use super::context::PipelineContext;
use crate::error::{Error, Result};
use crate::notify::DeliverySummary;
use crate::review::ReviewId;

/// Dispatches notifications for a processed review.
///
/// # Errors
///
/// Returns an error when the review, account, or subscriber rows are
/// missing; per-channel delivery failures are captured in the summary, not
/// raised.
pub async fn deliver_notification(
    ctx: &PipelineContext,
    review_id: ReviewId,
) -> Result<DeliverySummary> {
    let Some(review) = ctx.reviews.get(review_id).await? else {
        return Err(Error::ReviewNotFound(review_id));
    };
    let Some(account) = ctx.accounts.get(review.account_id).await? else {
        return Err(Error::AccountNotFound(review.account_id));
    };
    let Some(subscriber) = ctx.subscribers.get(account.subscriber_id).await? else {
        return Err(Error::SubscriberNotFound(account.subscriber_id));
    };

    let settings = ctx.settings.notification_settings(subscriber.id).await?;

    let summary = ctx
        .dispatcher
        .dispatch(&review, &subscriber, settings.as_ref())
        .await;

    info!(
        "Notification task for review {review_id}: {}/{} channels succeeded",
        summary.succeeded, summary.attempted
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::TestHarness;
    use crate::review::{AnalysisUpdate, Priority, Sentiment};
    use crate::settings::NotificationSettings;
    use crate::subscriber::Plan;

    async fn processed_review(harness: &TestHarness, priority: Priority) -> ReviewId {
        let account = harness.connect_account("inbox@example.com").await;
        let review = harness.seed_review(account.id, "m1", "Complaint").await;
        harness
            .ctx
            .reviews
            .store_analysis(
                review.id,
                &AnalysisUpdate {
                    sentiment: Sentiment::Negative,
                    priority,
                    summary: "Customer is unhappy.".to_string(),
                    problems: vec!["late delivery".to_string()],
                    suggestions: vec![],
                },
            )
            .await
            .unwrap();
        review.id
    }

    #[tokio::test]
    async fn starter_plan_reaches_email_and_telegram() {
        let harness = TestHarness::with_plan(Plan::Starter).await;
        let review_id = processed_review(&harness, Priority::Important).await;

        let mut settings = NotificationSettings::defaults(harness.subscriber.id);
        settings.telegram_enabled = true;
        settings.telegram_chat_id = Some("42".to_string());
        settings.sms_enabled = true;
        settings.phone_number = Some("+15551234567".to_string());
        harness
            .ctx
            .settings
            .save_notification_settings(&settings)
            .await
            .unwrap();

        let summary = deliver_notification(&harness.ctx, review_id).await.unwrap();

        // SMS enabled and addressed, but the starter plan is not entitled.
        assert_eq!(summary.attempted, 2);
        assert_eq!(harness.email_channel.attempts(), 1);
        assert_eq!(harness.telegram_channel.attempts(), 1);
        assert_eq!(harness.sms_channel.attempts(), 0);
    }

    #[tokio::test]
    async fn default_settings_skip_normal_priority() {
        let harness = TestHarness::with_plan(Plan::Professional).await;
        let review_id = processed_review(&harness, Priority::Normal).await;

        let summary = deliver_notification(&harness.ctx, review_id).await.unwrap();
        assert_eq!(summary.attempted, 0);
        assert_eq!(harness.email_channel.attempts(), 0);
    }

    #[tokio::test]
    async fn missing_review_is_an_error() {
        let harness = TestHarness::new().await;
        let err = deliver_notification(&harness.ctx, ReviewId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReviewNotFound(_)));
    }
}
