//! Notification channel contract.

use async_trait::async_trait;

use super::message::{ChannelResult, Notification};
use crate::settings::NotificationSettings;
use crate::subscriber::Subscriber;

/// Delivery mechanism identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Transactional email.
    Email,
    /// Telegram bot message.
    Telegram,
    /// SMS text message.
    Sms,
}

impl ChannelKind {
    /// Convert to display/log string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Telegram => "telegram",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery addresses resolved from the subscriber and their settings.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// Email address (always present; it is the subscriber's login).
    pub email: String,
    /// Telegram chat to deliver to.
    pub telegram_chat_id: Option<String>,
    /// Phone number to deliver to.
    pub phone_number: Option<String>,
}

impl Recipient {
    /// Builds the recipient for a subscriber from their settings.
    #[must_use]
    pub fn resolve(subscriber: &Subscriber, settings: &NotificationSettings) -> Self {
        Self {
            email: subscriber.email.clone(),
            telegram_chat_id: settings.telegram_chat_id.clone(),
            phone_number: settings.phone_number.clone(),
        }
    }

    /// Whether the recipient has the address this channel needs.
    #[must_use]
    pub const fn addresses(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Email => true,
            ChannelKind::Telegram => self.telegram_chat_id.is_some(),
            ChannelKind::Sms => self.phone_number.is_some(),
        }
    }
}

/// One notification delivery mechanism.
///
/// Implementations must not panic and must convert their own failures into
/// a failed [`ChannelResult`] — one channel's failure never blocks another's
/// attempt.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Which channel this is.
    fn kind(&self) -> ChannelKind;

    /// Whether the process-level configuration (API keys, sender identity)
    /// for this channel is present.
    fn is_configured(&self) -> bool;

    /// Attempts delivery to the recipient.
    async fn send(&self, recipient: &Recipient, notification: &Notification) -> ChannelResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::{Plan, SubscriberId};

    #[test]
    fn recipient_addressing() {
        let subscriber = Subscriber {
            id: SubscriberId::new(1),
            email: "owner@example.com".to_string(),
            plan: Plan::Professional,
            is_active: true,
        };
        let mut settings = NotificationSettings::defaults(subscriber.id);
        settings.phone_number = Some("+15551234567".to_string());

        let recipient = Recipient::resolve(&subscriber, &settings);
        assert!(recipient.addresses(ChannelKind::Email));
        assert!(recipient.addresses(ChannelKind::Sms));
        assert!(!recipient.addresses(ChannelKind::Telegram));
    }
}
