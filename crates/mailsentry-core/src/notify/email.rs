//! Transactional email channel (SendGrid).

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

use super::channel::{ChannelKind, NotificationChannel, Recipient};
use super::message::{ChannelResult, Notification};

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com/v3";

/// Email delivery via the SendGrid v3 API.
pub struct EmailChannel {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
    base_url: String,
}

impl EmailChannel {
    /// Creates the channel. An empty API key leaves it unconfigured.
    #[must_use]
    pub fn new(api_key: impl Into<String>, from_email: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            from_email: from_email.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (used against a local test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn subject_line(notification: &Notification) -> String {
        format!(
            "[{}] New review from {}",
            notification.priority_label(),
            notification.sender_display()
        )
    }

    fn body_html(notification: &Notification) -> String {
        let problems = if notification.problems.is_empty() {
            String::new()
        } else {
            let items: String = notification
                .problems
                .iter()
                .map(|p| format!("<li>{p}</li>"))
                .collect();
            format!("<p><b>Identified problems:</b></p><ul>{items}</ul>")
        };

        let provider_link = notification.message_url.as_ref().map_or_else(
            String::new,
            |url| format!("<p><a href=\"{url}\">Open the original message</a></p>"),
        );

        format!(
            "<h2>New review needs your attention</h2>\
             <p><b>Priority:</b> {}</p>\
             <p><b>From:</b> {} ({})</p>\
             <p><b>Subject:</b> {}</p>\
             <p><b>Summary:</b> {}</p>\
             {problems}\
             <p><a href=\"{}\">Open in dashboard</a></p>\
             {provider_link}",
            notification.priority_label(),
            notification.sender_display(),
            notification.sender_email,
            notification.subject,
            notification.summary,
            notification.dashboard_url,
        )
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.from_email.is_empty()
    }

    async fn send(&self, recipient: &Recipient, notification: &Notification) -> ChannelResult {
        if !self.is_configured() {
            return ChannelResult::failed(self.kind(), "email channel not configured");
        }

        let payload = json!({
            "personalizations": [{ "to": [{ "email": recipient.email }] }],
            "from": { "email": self.from_email },
            "subject": Self::subject_line(notification),
            "content": [{ "type": "text/html", "value": Self::body_html(notification) }],
        });

        let response = self
            .http
            .post(format!("{}/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let message_id = resp
                    .headers()
                    .get("x-message-id")
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string);
                debug!("Email notification sent to {}", recipient.email);
                ChannelResult::ok(self.kind(), message_id)
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                error!("Email send failed with status {status}: {body}");
                ChannelResult::failed(self.kind(), format!("status {status}: {body}"))
            }
            Err(e) => {
                error!("Email send failed: {e}");
                ChannelResult::failed(self.kind(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{Priority, ReviewId};

    fn notification() -> Notification {
        Notification {
            review_id: ReviewId::new(1),
            priority: Priority::Critical,
            summary: "Customer threatens chargeback.".to_string(),
            problems: vec!["double charge".to_string()],
            sender_email: "customer@example.com".to_string(),
            sender_name: Some("Dana".to_string()),
            subject: "Charged twice".to_string(),
            dashboard_url: "https://app.example.com/reviews/1".to_string(),
            message_url: None,
        }
    }

    #[test]
    fn configured_only_with_key_and_sender() {
        assert!(EmailChannel::new("sg-key", "noreply@example.com").is_configured());
        assert!(!EmailChannel::new("", "noreply@example.com").is_configured());
        assert!(!EmailChannel::new("sg-key", "").is_configured());
    }

    #[test]
    fn subject_carries_priority_and_sender() {
        let subject = EmailChannel::subject_line(&notification());
        assert_eq!(subject, "[Critical] New review from Dana");
    }

    #[test]
    fn body_lists_problems_and_links() {
        let body = EmailChannel::body_html(&notification());
        assert!(body.contains("<li>double charge</li>"));
        assert!(body.contains("https://app.example.com/reviews/1"));
        assert!(!body.contains("Open the original message"));
    }

    #[tokio::test]
    async fn unconfigured_send_fails_without_network() {
        let channel = EmailChannel::new("", "");
        let recipient = Recipient {
            email: "owner@example.com".to_string(),
            telegram_chat_id: None,
            phone_number: None,
        };
        let result = channel.send(&recipient, &notification()).await;
        assert!(!result.success);
    }
}
