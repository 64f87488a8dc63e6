//! Settings model types.

use crate::draft::ResponseTone;
use crate::review::Priority;
use crate::subscriber::SubscriberId;

/// Per-subscriber notification preferences.
///
/// One row per subscriber. Channel enablement here is intersected with plan
/// entitlement by the dispatcher; enabling a channel the plan does not cover
/// has no effect.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    /// Owning subscriber.
    pub subscriber_id: SubscriberId,
    /// Email channel enabled.
    pub email_enabled: bool,
    /// Telegram channel enabled.
    pub telegram_enabled: bool,
    /// Telegram chat to deliver to; required for a telegram attempt.
    pub telegram_chat_id: Option<String>,
    /// SMS channel enabled.
    pub sms_enabled: bool,
    /// Phone number to deliver to; required for an SMS attempt.
    pub phone_number: Option<String>,
    /// Notify on critical reviews.
    pub notify_on_critical: bool,
    /// Notify on important reviews.
    pub notify_on_important: bool,
    /// Notify on normal reviews.
    pub notify_on_normal: bool,
}

impl NotificationSettings {
    /// Default settings for a subscriber with no stored row.
    #[must_use]
    pub const fn defaults(subscriber_id: SubscriberId) -> Self {
        Self {
            subscriber_id,
            email_enabled: true,
            telegram_enabled: false,
            telegram_chat_id: None,
            sms_enabled: false,
            phone_number: None,
            notify_on_critical: true,
            notify_on_important: true,
            notify_on_normal: false,
        }
    }

    /// Whether the given priority should produce a notification.
    #[must_use]
    pub const fn notifies_on(&self, priority: Priority) -> bool {
        match priority {
            Priority::Critical => self.notify_on_critical,
            Priority::Important => self.notify_on_important,
            Priority::Normal => self.notify_on_normal,
        }
    }
}

/// Per-subscriber draft-response preferences.
#[derive(Debug, Clone)]
pub struct ResponderProfile {
    /// Owning subscriber.
    pub subscriber_id: SubscriberId,
    /// Company name used in signatures; generic fallback when absent.
    pub company_name: Option<String>,
    /// Default tone for generated drafts.
    pub response_tone: ResponseTone,
}

impl ResponderProfile {
    /// Default profile for a subscriber with no stored row.
    #[must_use]
    pub const fn defaults(subscriber_id: SubscriberId) -> Self {
        Self {
            subscriber_id,
            company_name: None,
            response_tone: ResponseTone::Professional,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_notify_on_critical_and_important_only() {
        let settings = NotificationSettings::defaults(SubscriberId::new(1));
        assert!(settings.notifies_on(Priority::Critical));
        assert!(settings.notifies_on(Priority::Important));
        assert!(!settings.notifies_on(Priority::Normal));
    }

    #[test]
    fn default_profile_is_professional() {
        let profile = ResponderProfile::defaults(SubscriberId::new(1));
        assert_eq!(profile.response_tone, ResponseTone::Professional);
        assert!(profile.company_name.is_none());
    }
}
