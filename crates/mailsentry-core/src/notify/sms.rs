//! SMS channel (Twilio).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use super::channel::{ChannelKind, NotificationChannel, Recipient};
use super::message::{ChannelResult, Notification};

const DEFAULT_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// SMS bodies stay compact; summaries are clipped to this length.
const SUMMARY_CAP: usize = 120;

/// SMS delivery via the Twilio Messages API.
pub struct SmsChannel {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TwilioResponse {
    sid: Option<String>,
}

impl SmsChannel {
    /// Creates the channel. Missing credentials leave it unconfigured.
    #[must_use]
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (used against a local test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_body(notification: &Notification) -> String {
        let mut summary = notification.summary.clone();
        if summary.chars().count() > SUMMARY_CAP {
            summary = summary.chars().take(SUMMARY_CAP).collect();
            summary.push_str("...");
        }

        format!(
            "[{}] Review from {}: {} {}",
            notification.priority_label(),
            notification.sender_display(),
            summary,
            notification.dashboard_url,
        )
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }

    async fn send(&self, recipient: &Recipient, notification: &Notification) -> ChannelResult {
        if !self.is_configured() {
            return ChannelResult::failed(self.kind(), "sms channel not configured");
        }

        let Some(to_number) = recipient.phone_number.as_deref() else {
            return ChannelResult::failed(self.kind(), "recipient has no phone number");
        };

        let response = self
            .http
            .post(format!(
                "{}/Accounts/{}/Messages.json",
                self.base_url, self.account_sid
            ))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to_number),
                ("From", self.from_number.as_str()),
                ("Body", &Self::build_body(notification)),
            ])
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let sid = resp
                    .json::<TwilioResponse>()
                    .await
                    .ok()
                    .and_then(|r| r.sid);
                debug!("SMS notification sent to {to_number}");
                ChannelResult::ok(self.kind(), sid)
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                error!("SMS send failed with status {status}: {body}");
                ChannelResult::failed(self.kind(), format!("status {status}: {body}"))
            }
            Err(e) => {
                error!("SMS send failed: {e}");
                ChannelResult::failed(self.kind(), e.to_string())
            }
        }
    }
}
