//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider mail API call failed.
    #[error("Provider error: {0}")]
    Provider(#[from] mailsentry_gmail::Error),

    /// OAuth operation failed.
    #[error("OAuth error: {0}")]
    OAuth(#[from] mailsentry_oauth::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Token encryption/decryption failed. Always terminal: it indicates
    /// corrupted state or a rotated key, never something a retry can fix.
    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    /// CSRF state token rejected during authorization.
    #[error("State token error: {0}")]
    StateToken(#[from] crate::credential::StateTokenError),

    /// Token refresh failed; the owning account has been deactivated.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Account has no stored credentials.
    #[error("No credentials stored for account {0}")]
    MissingCredentials(crate::account::AccountId),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(crate::account::AccountId),

    /// Review not found.
    #[error("Review not found: {0}")]
    ReviewNotFound(crate::review::ReviewId),

    /// Subscriber not found.
    #[error("Subscriber not found: {0}")]
    SubscriberNotFound(crate::subscriber::SubscriberId),

    /// Missing or invalid configuration. Fails fast at startup and is never
    /// retried.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a scheduled retry has any chance of succeeding.
    ///
    /// Only transient provider trouble qualifies; auth failures, crypto
    /// failures, configuration problems, and missing rows do not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether the error means the account's credentials are dead.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_auth(),
            Self::RefreshFailed(_) | Self::MissingCredentials(_) => true,
            Self::OAuth(e) => e.is_invalid_grant(),
            _ => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
