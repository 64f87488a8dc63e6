//! Account model types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::subscriber::SubscriberId;

/// Unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected mailbox account with encrypted `OAuth2` credentials and a
/// polling schedule.
///
/// Token columns hold ciphertext only; decryption goes through the
/// credential manager. Accounts are deactivated, not deleted, when their
/// credentials die.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning subscriber.
    pub subscriber_id: SubscriberId,
    /// Mailbox address.
    pub email: String,
    /// Provider tag (currently always "gmail").
    pub provider: String,
    /// Encrypted access token.
    pub access_token_enc: Option<String>,
    /// Encrypted refresh token.
    pub refresh_token_enc: Option<String>,
    /// Access token expiry.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Minutes between ingestion checks.
    pub check_interval_minutes: i64,
    /// Whether the account participates in scheduling.
    pub is_active: bool,
    /// Checkpoint: when the last successful ingestion run finished.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Whether the account is due for an ingestion check at `now`.
    ///
    /// A never-checked account is immediately due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.last_checked_at.is_none_or(|last| {
            last + Duration::minutes(self.check_interval_minutes) <= now
        })
    }

    /// Whether the stored access token has passed its expiry.
    #[must_use]
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Parameters for connecting (or reconnecting) an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Owning subscriber.
    pub subscriber_id: SubscriberId,
    /// Mailbox address.
    pub email: String,
    /// Provider tag.
    pub provider: String,
    /// Encrypted access token.
    pub access_token_enc: String,
    /// Encrypted refresh token, when the provider issued one.
    pub refresh_token_enc: Option<String>,
    /// Access token expiry.
    pub token_expires_at: Option<DateTime<Utc>>,
}
