//! Notification dispatcher.

use std::sync::Arc;

use tracing::{info, warn};

use super::channel::{ChannelKind, NotificationChannel, Recipient};
use super::message::{ChannelResult, DeliverySummary, Notification};
use crate::review::{Priority, Review, ReviewId};
use crate::settings::NotificationSettings;
use crate::subscriber::{Plan, Subscriber};

/// Channels a plan is entitled to.
#[must_use]
pub const fn entitled_channels(plan: Plan) -> &'static [ChannelKind] {
    match plan {
        Plan::Free => &[ChannelKind::Email],
        Plan::Starter => &[ChannelKind::Email, ChannelKind::Telegram],
        Plan::Professional | Plan::Enterprise => {
            &[ChannelKind::Email, ChannelKind::Telegram, ChannelKind::Sms]
        }
    }
}

/// Fans a review notification out across the subscriber's channels.
///
/// Dispatch order of operations:
/// 1. Per-priority notify flags gate the whole dispatch.
/// 2. The plan-entitled channel set is intersected with individually
///    enabled, configured, and addressable channels.
/// 3. One payload is built and every selected channel attempts delivery
///    independently.
/// 4. Per-channel results aggregate into a [`DeliverySummary`].
pub struct Dispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    dashboard_url: String,
}

impl Dispatcher {
    /// Creates a dispatcher over the given channel set.
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, dashboard_url: impl Into<String>) -> Self {
        Self {
            channels,
            dashboard_url: dashboard_url.into(),
        }
    }

    /// Whether this priority should notify under the given settings.
    ///
    /// Subscribers without a stored settings row get the defaults: critical
    /// and important notify, normal does not.
    #[must_use]
    pub fn should_notify(
        priority: Priority,
        settings: Option<&NotificationSettings>,
        subscriber: &Subscriber,
    ) -> bool {
        settings.map_or_else(
            || NotificationSettings::defaults(subscriber.id).notifies_on(priority),
            |s| s.notifies_on(priority),
        )
    }

    /// Selects the channels a dispatch will attempt.
    fn select(
        &self,
        plan: Plan,
        settings: &NotificationSettings,
        recipient: &Recipient,
    ) -> Vec<&Arc<dyn NotificationChannel>> {
        let entitled = entitled_channels(plan);

        self.channels
            .iter()
            .filter(|channel| {
                let kind = channel.kind();
                entitled.contains(&kind)
                    && channel_enabled(settings, kind)
                    && channel.is_configured()
                    && recipient.addresses(kind)
            })
            .collect()
    }

    /// Dispatches a review notification.
    pub async fn dispatch(
        &self,
        review: &Review,
        subscriber: &Subscriber,
        settings: Option<&NotificationSettings>,
    ) -> DeliverySummary {
        let priority = review.priority.unwrap_or_default();

        if !Self::should_notify(priority, settings, subscriber) {
            info!(
                "Skipping notification for review {}: priority {} not enabled",
                review.id,
                priority.as_str()
            );
            return DeliverySummary::default();
        }

        let effective_settings = settings
            .cloned()
            .unwrap_or_else(|| NotificationSettings::defaults(subscriber.id));
        let recipient = Recipient::resolve(subscriber, &effective_settings);

        let selected = self.select(subscriber.plan, &effective_settings, &recipient);
        if selected.is_empty() {
            warn!(
                "No usable notification channels for subscriber {}",
                subscriber.id
            );
            return DeliverySummary::default();
        }

        let notification = Notification::for_review(review, &self.dashboard_url);

        let mut results = Vec::with_capacity(selected.len());
        for channel in selected {
            let result = channel.send(&recipient, &notification).await;
            if result.success {
                info!(
                    "Notification sent via {} for review {}",
                    result.channel, review.id
                );
            } else {
                warn!(
                    "Notification via {} failed for review {}: {}",
                    result.channel,
                    review.id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        DeliverySummary::from_results(results)
    }

    /// Sends an account alert (auth failure, quota trouble) to the
    /// subscriber. Email only, bypassing per-priority flags.
    pub async fn send_account_alert(
        &self,
        subscriber: &Subscriber,
        subject: &str,
        message: &str,
    ) -> DeliverySummary {
        let notification = Notification {
            review_id: ReviewId::new(0),
            priority: Priority::Important,
            summary: message.to_string(),
            problems: vec![],
            sender_email: "system@mailsentry.dev".to_string(),
            sender_name: Some("MailSentry".to_string()),
            subject: subject.to_string(),
            dashboard_url: format!("{}/settings", self.dashboard_url),
            message_url: None,
        };

        let recipient = Recipient {
            email: subscriber.email.clone(),
            telegram_chat_id: None,
            phone_number: None,
        };

        let results: Vec<ChannelResult> = match self
            .channels
            .iter()
            .find(|c| c.kind() == ChannelKind::Email && c.is_configured())
        {
            Some(email) => vec![email.send(&recipient, &notification).await],
            None => Vec::new(),
        };

        DeliverySummary::from_results(results)
    }
}

const fn channel_enabled(settings: &NotificationSettings, kind: ChannelKind) -> bool {
    match kind {
        ChannelKind::Email => settings.email_enabled,
        ChannelKind::Telegram => settings.telegram_enabled,
        ChannelKind::Sms => settings.sms_enabled,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::review::Sentiment;
    use crate::subscriber::SubscriberId;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Records attempts instead of hitting a network.
    struct StubChannel {
        kind: ChannelKind,
        configured: bool,
        succeed: bool,
        sent: Mutex<Vec<String>>,
    }

    impl StubChannel {
        fn new(kind: ChannelKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                configured: true,
                succeed: true,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn failing(kind: ChannelKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                configured: true,
                succeed: false,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationChannel for StubChannel {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn send(&self, recipient: &Recipient, _n: &Notification) -> ChannelResult {
            self.sent.lock().unwrap().push(recipient.email.clone());
            if self.succeed {
                ChannelResult::ok(self.kind, None)
            } else {
                ChannelResult::failed(self.kind, "stub failure")
            }
        }
    }

    fn subscriber(plan: Plan) -> Subscriber {
        Subscriber {
            id: SubscriberId::new(1),
            email: "owner@example.com".to_string(),
            plan,
            is_active: true,
        }
    }

    fn review(priority: Priority) -> Review {
        Review {
            id: ReviewId::new(5),
            account_id: AccountId::new(1),
            message_id: "m5".to_string(),
            sender_email: "customer@example.com".to_string(),
            sender_name: None,
            subject: "Problem".to_string(),
            received_at: Utc::now(),
            sentiment: Some(Sentiment::Negative),
            priority: Some(priority),
            summary: Some("Angry customer.".to_string()),
            problems: vec![],
            suggestions: vec![],
            is_processed: true,
            processed_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    fn all_enabled_settings() -> NotificationSettings {
        let mut settings = NotificationSettings::defaults(SubscriberId::new(1));
        settings.telegram_enabled = true;
        settings.telegram_chat_id = Some("12345".to_string());
        settings.sms_enabled = true;
        settings.phone_number = Some("+15551234567".to_string());
        settings
    }

    #[tokio::test]
    async fn free_plan_never_reaches_telegram_or_sms() {
        let email = StubChannel::new(ChannelKind::Email);
        let telegram = StubChannel::new(ChannelKind::Telegram);
        let sms = StubChannel::new(ChannelKind::Sms);
        let dispatcher = Dispatcher::new(
            vec![email.clone(), telegram.clone(), sms.clone()],
            "https://app.example.com",
        );

        let summary = dispatcher
            .dispatch(
                &review(Priority::Important),
                &subscriber(Plan::Free),
                Some(&all_enabled_settings()),
            )
            .await;

        assert_eq!(summary.attempted, 1);
        assert_eq!(email.attempts(), 1);
        assert_eq!(telegram.attempts(), 0);
        assert_eq!(sms.attempts(), 0);
    }

    #[tokio::test]
    async fn professional_plan_with_phone_gets_sms() {
        let email = StubChannel::new(ChannelKind::Email);
        let telegram = StubChannel::new(ChannelKind::Telegram);
        let sms = StubChannel::new(ChannelKind::Sms);
        let dispatcher = Dispatcher::new(
            vec![email.clone(), telegram.clone(), sms.clone()],
            "https://app.example.com",
        );

        let summary = dispatcher
            .dispatch(
                &review(Priority::Critical),
                &subscriber(Plan::Professional),
                Some(&all_enabled_settings()),
            )
            .await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(sms.attempts(), 1);
    }

    #[tokio::test]
    async fn sms_without_phone_number_is_not_attempted() {
        let sms = StubChannel::new(ChannelKind::Sms);
        let dispatcher = Dispatcher::new(vec![sms.clone()], "https://app.example.com");

        let mut settings = all_enabled_settings();
        settings.phone_number = None;

        let summary = dispatcher
            .dispatch(
                &review(Priority::Critical),
                &subscriber(Plan::Professional),
                Some(&settings),
            )
            .await;

        assert_eq!(summary.attempted, 0);
        assert_eq!(sms.attempts(), 0);
    }

    #[tokio::test]
    async fn disabled_priority_returns_empty_summary_without_attempts() {
        let email = StubChannel::new(ChannelKind::Email);
        let dispatcher = Dispatcher::new(vec![email.clone()], "https://app.example.com");

        // Defaults do not notify on normal priority.
        let summary = dispatcher
            .dispatch(&review(Priority::Normal), &subscriber(Plan::Professional), None)
            .await;

        assert_eq!(summary.attempted, 0);
        assert_eq!(email.attempts(), 0);
    }

    #[tokio::test]
    async fn one_channel_failure_does_not_block_others() {
        let email = StubChannel::failing(ChannelKind::Email);
        let telegram = StubChannel::new(ChannelKind::Telegram);
        let dispatcher = Dispatcher::new(
            vec![email.clone(), telegram.clone()],
            "https://app.example.com",
        );

        let summary = dispatcher
            .dispatch(
                &review(Priority::Important),
                &subscriber(Plan::Starter),
                Some(&all_enabled_settings()),
            )
            .await;

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(telegram.attempts(), 1);
    }

    #[tokio::test]
    async fn account_alert_uses_email_only() {
        let email = StubChannel::new(ChannelKind::Email);
        let telegram = StubChannel::new(ChannelKind::Telegram);
        let dispatcher = Dispatcher::new(
            vec![email.clone(), telegram.clone()],
            "https://app.example.com",
        );

        let summary = dispatcher
            .send_account_alert(
                &subscriber(Plan::Professional),
                "Mailbox disconnected",
                "Reconnect your mailbox to resume monitoring.",
            )
            .await;

        assert_eq!(summary.attempted, 1);
        assert_eq!(email.attempts(), 1);
        assert_eq!(telegram.attempts(), 0);
    }
}
