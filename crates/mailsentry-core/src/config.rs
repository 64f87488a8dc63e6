//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Runtime settings for the pipeline.
///
/// Everything is read once at startup. Credentials for optional channels may
/// be empty — the corresponding channel then reports itself unconfigured —
/// but the token encryption key and the completion API key are hard
/// requirements.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path to the sqlite database file.
    pub database_path: String,
    /// Base64-encoded 32-byte AES key for token encryption at rest.
    pub token_encryption_key: String,
    /// Google OAuth client ID.
    pub google_client_id: String,
    /// Google OAuth client secret.
    pub google_client_secret: String,
    /// Redirect URI registered with the OAuth client.
    pub google_redirect_uri: String,
    /// Mistral API key for the analysis and draft stages.
    pub mistral_api_key: String,
    /// Completion model identifier.
    pub ai_model: String,
    /// Token cap per completion call.
    pub ai_max_tokens: u32,
    /// Sampling temperature for analysis calls.
    pub ai_temperature: f64,
    /// SendGrid API key (email channel; optional).
    pub sendgrid_api_key: String,
    /// From address for notification emails.
    pub notification_from_email: String,
    /// Telegram bot token (telegram channel; optional).
    pub telegram_bot_token: String,
    /// Twilio account SID (SMS channel; optional).
    pub twilio_account_sid: String,
    /// Twilio auth token.
    pub twilio_auth_token: String,
    /// Twilio sending phone number.
    pub twilio_phone_number: String,
    /// Dashboard base URL for notification deep links.
    pub dashboard_url: String,
    /// Seconds between scheduler scans.
    pub scheduler_interval: Duration,
    /// Number of queue workers.
    pub worker_count: usize,
    /// Wall-clock cap per task execution.
    pub task_timeout: Duration,
    /// Messages fetched per ingestion run.
    pub ingest_page_size: u32,
}

impl Settings {
    /// Loads settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a required variable is missing or
    /// a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        let token_encryption_key = required("MAILSENTRY_TOKEN_ENCRYPTION_KEY")?;
        let mistral_api_key = required("MAILSENTRY_MISTRAL_API_KEY")?;

        Ok(Self {
            database_path: optional("MAILSENTRY_DATABASE_PATH", "mailsentry.db"),
            token_encryption_key,
            google_client_id: optional("MAILSENTRY_GOOGLE_CLIENT_ID", ""),
            google_client_secret: optional("MAILSENTRY_GOOGLE_CLIENT_SECRET", ""),
            google_redirect_uri: optional(
                "MAILSENTRY_GOOGLE_REDIRECT_URI",
                "http://localhost:8000/oauth/callback",
            ),
            mistral_api_key,
            ai_model: optional("MAILSENTRY_AI_MODEL", "mistral-large-latest"),
            ai_max_tokens: parsed("MAILSENTRY_AI_MAX_TOKENS", 1000)?,
            ai_temperature: parsed("MAILSENTRY_AI_TEMPERATURE", 0.3)?,
            sendgrid_api_key: optional("MAILSENTRY_SENDGRID_API_KEY", ""),
            notification_from_email: optional(
                "MAILSENTRY_NOTIFICATION_FROM_EMAIL",
                "noreply@mailsentry.dev",
            ),
            telegram_bot_token: optional("MAILSENTRY_TELEGRAM_BOT_TOKEN", ""),
            twilio_account_sid: optional("MAILSENTRY_TWILIO_ACCOUNT_SID", ""),
            twilio_auth_token: optional("MAILSENTRY_TWILIO_AUTH_TOKEN", ""),
            twilio_phone_number: optional("MAILSENTRY_TWILIO_PHONE_NUMBER", ""),
            dashboard_url: optional("MAILSENTRY_DASHBOARD_URL", "http://localhost:3000"),
            scheduler_interval: Duration::from_secs(parsed(
                "MAILSENTRY_SCHEDULER_INTERVAL_SECS",
                60,
            )?),
            worker_count: parsed("MAILSENTRY_WORKER_COUNT", 4)?,
            task_timeout: Duration::from_secs(parsed("MAILSENTRY_TASK_TIMEOUT_SECS", 30 * 60)?),
            ingest_page_size: parsed("MAILSENTRY_INGEST_PAGE_SIZE", 50)?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_key_is_config_error() {
        // Neither required variable is set in the test environment.
        let err = required("MAILSENTRY_TEST_UNSET_KEY").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn optional_falls_back_to_default() {
        assert_eq!(optional("MAILSENTRY_TEST_UNSET_KEY", "fallback"), "fallback");
    }

    #[test]
    fn parsed_uses_default_when_unset() {
        let value: u32 = parsed("MAILSENTRY_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }
}
