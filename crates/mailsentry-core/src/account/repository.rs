//! Account storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::model::{Account, AccountId, NewAccount};
use crate::Result;
use crate::subscriber::SubscriberId;

/// Repository for account storage and retrieval.
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
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
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subscriber_id INTEGER NOT NULL,
                email TEXT NOT NULL,
                provider TEXT NOT NULL DEFAULT 'gmail',
                access_token_enc TEXT,
                refresh_token_enc TEXT,
                token_expires_at TEXT,
                check_interval_minutes INTEGER NOT NULL DEFAULT 15,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_checked_at TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(subscriber_id, email)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_accounts_active
            ON accounts(is_active)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Connect an account, updating tokens in place if the same
    /// (subscriber, email) pair already exists. Reconnection reactivates a
    /// previously deactivated account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert(&self, new: NewAccount) -> Result<Account> {
        sqlx::query(
            r"
            INSERT INTO accounts (
                subscriber_id, email, provider,
                access_token_enc, refresh_token_enc, token_expires_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(subscriber_id, email) DO UPDATE SET
                access_token_enc = excluded.access_token_enc,
                refresh_token_enc = COALESCE(excluded.refresh_token_enc, refresh_token_enc),
                token_expires_at = excluded.token_expires_at,
                is_active = 1
            ",
        )
        .bind(new.subscriber_id.0)
        .bind(&new.email)
        .bind(&new.provider)
        .bind(&new.access_token_enc)
        .bind(&new.refresh_token_enc)
        .bind(new.token_expires_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r"
            SELECT id, subscriber_id, email, provider,
                   access_token_enc, refresh_token_enc, token_expires_at,
                   check_interval_minutes, is_active, last_checked_at
            FROM accounts
            WHERE subscriber_id = ? AND email = ?
            ",
        )
        .bind(new.subscriber_id.0)
        .bind(&new.email)
        .fetch_one(&self.pool)
        .await?;

        debug!("Upserted account for {}", new.email);
        Ok(row_to_account(&row))
    }

    /// Get account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r"
            SELECT id, subscriber_id, email, provider,
                   access_token_enc, refresh_token_enc, token_expires_at,
                   check_interval_minutes, is_active, last_checked_at
            FROM accounts
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_account))
    }

    /// Get all active accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r"
            SELECT id, subscriber_id, email, provider,
                   access_token_enc, refresh_token_enc, token_expires_at,
                   check_interval_minutes, is_active, last_checked_at
            FROM accounts
            WHERE is_active = 1
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Get all accounts for a subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_subscriber(&self, subscriber: SubscriberId) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r"
            SELECT id, subscriber_id, email, provider,
                   access_token_enc, refresh_token_enc, token_expires_at,
                   check_interval_minutes, is_active, last_checked_at
            FROM accounts
            WHERE subscriber_id = ?
            ORDER BY id ASC
            ",
        )
        .bind(subscriber.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Flip the account's active flag off (unrecoverable auth failure).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn deactivate(&self, id: AccountId) -> Result<()> {
        sqlx::query("UPDATE accounts SET is_active = 0 WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Store a freshly refreshed access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn store_access_token(
        &self,
        id: AccountId,
        access_token_enc: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query("UPDATE accounts SET access_token_enc = ?, token_expires_at = ? WHERE id = ?")
            .bind(access_token_enc)
            .bind(expires_at.map(|dt| dt.to_rfc3339()))
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Advance the ingestion checkpoint. Done once per successful run, not
    /// per message, so a crash mid-page re-fetches and dedups on retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn advance_checkpoint(&self, id: AccountId, to: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE accounts SET last_checked_at = ? WHERE id = ?")
            .bind(to.to_rfc3339())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete an account (revocation path). Reviews cascade via the
    /// review repository's foreign key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Account {
    Account {
        id: AccountId::new(row.get("id")),
        subscriber_id: SubscriberId::new(row.get("subscriber_id")),
        email: row.get("email"),
        provider: row.get("provider"),
        access_token_enc: row.get("access_token_enc"),
        refresh_token_enc: row.get("refresh_token_enc"),
        token_expires_at: parse_timestamp(row.get("token_expires_at")),
        check_interval_minutes: row.get("check_interval_minutes"),
        is_active: row.get::<i64, _>("is_active") != 0,
        last_checked_at: parse_timestamp(row.get("last_checked_at")),
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
