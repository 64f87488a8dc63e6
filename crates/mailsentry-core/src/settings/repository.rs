//! Settings storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{NotificationSettings, ResponderProfile};
use crate::Result;
use crate::draft::ResponseTone;
use crate::subscriber::SubscriberId;

/// Repository for notification settings and responder profiles.
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS notification_settings (
                subscriber_id INTEGER PRIMARY KEY,
                email_enabled INTEGER NOT NULL DEFAULT 1,
                telegram_enabled INTEGER NOT NULL DEFAULT 0,
                telegram_chat_id TEXT,
                sms_enabled INTEGER NOT NULL DEFAULT 0,
                phone_number TEXT,
                notify_on_critical INTEGER NOT NULL DEFAULT 1,
                notify_on_important INTEGER NOT NULL DEFAULT 1,
                notify_on_normal INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS responder_profiles (
                subscriber_id INTEGER PRIMARY KEY,
                company_name TEXT,
                response_tone TEXT NOT NULL DEFAULT 'professional'
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get notification settings for a subscriber, if stored.
    ///
    /// Callers fall back to [`NotificationSettings::defaults`] when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn notification_settings(
        &self,
        subscriber: SubscriberId,
    ) -> Result<Option<NotificationSettings>> {
        let row = sqlx::query("SELECT * FROM notification_settings WHERE subscriber_id = ?")
            .bind(subscriber.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_settings))
    }

    /// Store notification settings (insert or replace).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO notification_settings (
                subscriber_id, email_enabled, telegram_enabled, telegram_chat_id,
                sms_enabled, phone_number,
                notify_on_critical, notify_on_important, notify_on_normal
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(settings.subscriber_id.0)
        .bind(settings.email_enabled)
        .bind(settings.telegram_enabled)
        .bind(&settings.telegram_chat_id)
        .bind(settings.sms_enabled)
        .bind(&settings.phone_number)
        .bind(settings.notify_on_critical)
        .bind(settings.notify_on_important)
        .bind(settings.notify_on_normal)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the responder profile, creating the default row on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn responder_profile(&self, subscriber: SubscriberId) -> Result<ResponderProfile> {
        let row = sqlx::query("SELECT * FROM responder_profiles WHERE subscriber_id = ?")
            .bind(subscriber.0)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(row_to_profile(&row));
        }

        let profile = ResponderProfile::defaults(subscriber);
        self.save_responder_profile(&profile).await?;
        Ok(profile)
    }

    /// Store a responder profile (insert or replace).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn save_responder_profile(&self, profile: &ResponderProfile) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO responder_profiles (
                subscriber_id, company_name, response_tone
            ) VALUES (?, ?, ?)
            ",
        )
        .bind(profile.subscriber_id.0)
        .bind(&profile.company_name)
        .bind(profile.response_tone.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_settings(row: &sqlx::sqlite::SqliteRow) -> NotificationSettings {
    NotificationSettings {
        subscriber_id: SubscriberId::new(row.get("subscriber_id")),
        email_enabled: row.get::<i64, _>("email_enabled") != 0,
        telegram_enabled: row.get::<i64, _>("telegram_enabled") != 0,
        telegram_chat_id: row.get("telegram_chat_id"),
        sms_enabled: row.get::<i64, _>("sms_enabled") != 0,
        phone_number: row.get("phone_number"),
        notify_on_critical: row.get::<i64, _>("notify_on_critical") != 0,
        notify_on_important: row.get::<i64, _>("notify_on_important") != 0,
        notify_on_normal: row.get::<i64, _>("notify_on_normal") != 0,
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> ResponderProfile {
    ResponderProfile {
        subscriber_id: SubscriberId::new(row.get("subscriber_id")),
        company_name: row.get("company_name"),
        response_tone: ResponseTone::parse(row.get("response_tone")),
    }
}
