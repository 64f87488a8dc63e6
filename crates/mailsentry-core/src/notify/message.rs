//! Notification payload and delivery results.

use crate::review::{Priority, Review, ReviewId};

/// Channel-agnostic notification content.
///
/// Built once per dispatch and handed to every selected channel.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Review the notification is about.
    pub review_id: ReviewId,
    /// Review priority.
    pub priority: Priority,
    /// Analysis summary.
    pub summary: String,
    /// Extracted problems.
    pub problems: Vec<String>,
    /// Sender address of the reviewed message.
    pub sender_email: String,
    /// Sender display name, when known.
    pub sender_name: Option<String>,
    /// Subject of the reviewed message.
    pub subject: String,
    /// Deep link into the dashboard.
    pub dashboard_url: String,
    /// Deep link to the message at the provider, when available.
    pub message_url: Option<String>,
}

impl Notification {
    /// Builds the payload for a review.
    #[must_use]
    pub fn for_review(review: &Review, dashboard_base: &str) -> Self {
        let message_url = if review.message_id.is_empty() {
            None
        } else {
            Some(format!(
                "https://mail.google.com/mail/u/0/#search/rfc822msgid:{}",
                review.message_id
            ))
        };

        Self {
            review_id: review.id,
            priority: review.priority.unwrap_or_default(),
            summary: review.summary.clone().unwrap_or_default(),
            problems: review.problems.clone(),
            sender_email: review.sender_email.clone(),
            sender_name: review.sender_name.clone(),
            subject: review.subject.clone(),
            dashboard_url: format!("{dashboard_base}/reviews/{}", review.id),
            message_url,
        }
    }

    /// Sender display string: name when known, address otherwise.
    #[must_use]
    pub fn sender_display(&self) -> &str {
        self.sender_name.as_deref().unwrap_or(&self.sender_email)
    }

    /// Human-readable priority label.
    #[must_use]
    pub const fn priority_label(&self) -> &'static str {
        match self.priority {
            Priority::Critical => "Critical",
            Priority::Important => "Important",
            Priority::Normal => "Normal",
        }
    }
}

/// Result of one channel's delivery attempt.
#[derive(Debug, Clone)]
pub struct ChannelResult {
    /// Channel that attempted delivery.
    pub channel: super::ChannelKind,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error detail for failed attempts.
    pub error: Option<String>,
    /// Provider message ID for successful attempts, when reported.
    pub message_id: Option<String>,
}

impl ChannelResult {
    /// A successful attempt.
    #[must_use]
    pub const fn ok(channel: super::ChannelKind, message_id: Option<String>) -> Self {
        Self {
            channel,
            success: true,
            error: None,
            message_id,
        }
    }

    /// A failed attempt.
    #[must_use]
    pub fn failed(channel: super::ChannelKind, error: impl Into<String>) -> Self {
        Self {
            channel,
            success: false,
            error: Some(error.into()),
            message_id: None,
        }
    }
}

/// Aggregated outcome of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    /// Channels attempted.
    pub attempted: usize,
    /// Successful attempts.
    pub succeeded: usize,
    /// Failed attempts.
    pub failed: usize,
    /// Per-channel detail.
    pub results: Vec<ChannelResult>,
}

impl DeliverySummary {
    /// Compiles a summary from per-channel results.
    #[must_use]
    pub fn from_results(results: Vec<ChannelResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            attempted: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Whether at least one channel delivered.
    #[must_use]
    pub const fn any_succeeded(&self) -> bool {
        self.succeeded > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::review::Sentiment;
    use chrono::Utc;

    fn review() -> Review {
        Review {
            id: ReviewId::new(42),
            account_id: AccountId::new(1),
            message_id: "abc123".to_string(),
            sender_email: "customer@example.com".to_string(),
            sender_name: Some("Dana".to_string()),
            subject: "Late order".to_string(),
            received_at: Utc::now(),
            sentiment: Some(Sentiment::Negative),
            priority: Some(Priority::Important),
            summary: Some("Order arrived late.".to_string()),
            problems: vec!["late delivery".to_string()],
            suggestions: vec![],
            is_processed: true,
            processed_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn payload_carries_deep_links() {
        let n = Notification::for_review(&review(), "https://app.example.com");
        assert_eq!(n.dashboard_url, "https://app.example.com/reviews/42");
        assert_eq!(
            n.message_url.as_deref(),
            Some("https://mail.google.com/mail/u/0/#search/rfc822msgid:abc123")
        );
        assert_eq!(n.sender_display(), "Dana");
        assert_eq!(n.priority_label(), "Important");
    }

    #[test]
    fn summary_counts_outcomes() {
        let results = vec![
            ChannelResult::ok(super::super::ChannelKind::Email, None),
            ChannelResult::failed(super::super::ChannelKind::Sms, "no credit"),
        ];
        let summary = DeliverySummary::from_results(results);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.any_succeeded());
    }
}
