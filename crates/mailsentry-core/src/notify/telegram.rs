//! Telegram bot channel.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

use super::channel::{ChannelKind, NotificationChannel, Recipient};
use super::message::{ChannelResult, Notification};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Maximum problems listed before collapsing to a count.
const PROBLEM_LIST_CAP: usize = 5;

/// Telegram delivery via the Bot API.
pub struct TelegramChannel {
    http: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl TelegramChannel {
    /// Creates the channel. An empty bot token leaves it unconfigured.
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: bot_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (used against a local test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_message(notification: &Notification) -> String {
        let mut problems_block = String::new();
        if !notification.problems.is_empty() {
            let listed: Vec<String> = notification
                .problems
                .iter()
                .take(PROBLEM_LIST_CAP)
                .map(|p| format!("  - {p}"))
                .collect();
            problems_block = format!("\n\n*Identified problems:*\n{}", listed.join("\n"));
            if notification.problems.len() > PROBLEM_LIST_CAP {
                problems_block.push_str(&format!(
                    "\n  ... and {} more",
                    notification.problems.len() - PROBLEM_LIST_CAP
                ));
            }
        }

        format!(
            "*New review needs attention*\n\n\
             *Priority:* {}\n\
             *From:* {}\n\
             *Subject:* {}\n\n\
             *Summary:*\n{}\
             {problems_block}\n\n\
             [Open in dashboard]({})",
            notification.priority_label(),
            notification.sender_display(),
            notification.subject,
            notification.summary,
            notification.dashboard_url,
        )
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty()
    }

    async fn send(&self, recipient: &Recipient, notification: &Notification) -> ChannelResult {
        if !self.is_configured() {
            return ChannelResult::failed(self.kind(), "telegram bot token not configured");
        }

        let Some(chat_id) = recipient.telegram_chat_id.as_deref() else {
            return ChannelResult::failed(self.kind(), "recipient has no telegram chat id");
        };

        let payload = json!({
            "chat_id": chat_id,
            "text": Self::build_message(notification),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let response = self
            .http
            .post(format!(
                "{}/bot{}/sendMessage",
                self.base_url, self.bot_token
            ))
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let message_id = resp
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v["result"]["message_id"].as_i64())
                    .map(|id| id.to_string());
                debug!("Telegram notification sent to chat {chat_id}");
                ChannelResult::ok(self.kind(), message_id)
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                error!("Telegram send failed with status {status}: {body}");
                ChannelResult::failed(self.kind(), format!("status {status}: {body}"))
            }
            Err(e) => {
                error!("Telegram send failed: {e}");
                ChannelResult::failed(self.kind(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{Priority, ReviewId};

    fn notification(problems: Vec<String>) -> Notification {
        Notification {
            review_id: ReviewId::new(1),
            priority: Priority::Important,
            summary: "Order arrived late.".to_string(),
            problems,
            sender_email: "customer@example.com".to_string(),
            sender_name: None,
            subject: "Late order".to_string(),
            dashboard_url: "https://app.example.com/reviews/1".to_string(),
            message_url: None,
        }
    }

    #[test]
    fn message_shows_sender_address_without_name() {
        let text = TelegramChannel::build_message(&notification(vec![]));
        assert!(text.contains("customer@example.com"));
        assert!(text.contains("*Priority:* Important"));
        assert!(!text.contains("Identified problems"));
    }

    #[test]
    fn long_problem_lists_are_capped() {
        let problems = (1..=8).map(|i| format!("problem {i}")).collect();
        let text = TelegramChannel::build_message(&notification(problems));
        assert!(text.contains("problem 5"));
        assert!(!text.contains("problem 6"));
        assert!(text.contains("... and 3 more"));
    }

    #[tokio::test]
    async fn missing_chat_id_fails_locally() {
        let channel = TelegramChannel::new("bot-token");
        let recipient = Recipient {
            email: "owner@example.com".to_string(),
            telegram_chat_id: None,
            phone_number: None,
        };
        let result = channel.send(&recipient, &notification(vec![])).await;
        assert!(!result.success);
        assert!(result.error.unwrap_or_default().contains("chat id"));
    }
}
