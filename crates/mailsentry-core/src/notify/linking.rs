//! Telegram account linking.
//!
//! A subscriber requests a one-time code in the dashboard and sends it to
//! the bot; when the bot webhook confirms the code, the chat is bound to
//! the subscriber's notification settings.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tracing::info;

use crate::Result;
use crate::kv::{Fetched, KeyValueStore};
use crate::settings::{NotificationSettings, SettingsRepository};
use crate::subscriber::SubscriberId;

/// Linking codes live this long.
const CODE_TTL: Duration = Duration::from_secs(600);

const CODE_PREFIX: &str = "telegram_code:";

/// Issues and redeems one-time Telegram linking codes.
pub struct TelegramLinker {
    kv: Arc<dyn KeyValueStore>,
    settings: Arc<SettingsRepository>,
}

impl TelegramLinker {
    /// Creates a linker over the given store and settings repository.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, settings: Arc<SettingsRepository>) -> Self {
        Self { kv, settings }
    }

    /// Issues a fresh code bound to the subscriber (10 minute TTL).
    pub async fn generate_code(&self, subscriber: SubscriberId) -> String {
        let mut bytes = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut bytes);
        let code = URL_SAFE_NO_PAD.encode(bytes);

        self.kv
            .put(
                &format!("{CODE_PREFIX}{code}"),
                &subscriber.0.to_string(),
                CODE_TTL,
            )
            .await;

        code
    }

    /// Redeems a code, binding `chat_id` to the owning subscriber's
    /// settings and enabling the telegram channel. Returns the subscriber
    /// on success, `None` for unknown or expired codes (single use).
    ///
    /// # Errors
    ///
    /// Returns an error if the settings update fails.
    pub async fn confirm(&self, code: &str, chat_id: &str) -> Result<Option<SubscriberId>> {
        let key = format!("{CODE_PREFIX}{code}");
        let subscriber = match self.kv.fetch(&key).await {
            Fetched::Hit(raw) => {
                self.kv.remove(&key).await;
                match raw.parse::<i64>() {
                    Ok(id) => SubscriberId::new(id),
                    Err(_) => return Ok(None),
                }
            }
            Fetched::Expired | Fetched::Missing => return Ok(None),
        };

        let mut settings = self
            .settings
            .notification_settings(subscriber)
            .await?
            .unwrap_or_else(|| NotificationSettings::defaults(subscriber));
        settings.telegram_chat_id = Some(chat_id.to_string());
        settings.telegram_enabled = true;
        self.settings.save_notification_settings(&settings).await?;

        info!("Linked telegram chat {chat_id} to subscriber {subscriber}");
        Ok(Some(subscriber))
    }
}
