//! Credential manager.
//!
//! Owns the encrypted `OAuth2` tokens for connected accounts: issues
//! authorization URLs with single-use CSRF state, completes the code
//! exchange, surfaces decrypted access tokens with transparent refresh, and
//! handles revocation. Refresh failures deactivate the owning account and
//! are never retried — a dead refresh token cannot become valid again.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use mailsentry_oauth::{AuthorizationCodeFlow, OAuthClient, Token};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::account::{Account, AccountRepository, NewAccount};
use crate::crypto::TokenCipher;
use crate::error::{Error, Result};
use crate::kv::{Fetched, KeyValueStore};
use crate::subscriber::SubscriberId;

/// CSRF state tokens live this long.
const STATE_TTL: Duration = Duration::from_secs(300);

const STATE_PREFIX: &str = "oauth_state:";

/// Typed rejection of a CSRF state token.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateTokenError {
    /// The token was issued but its five-minute window has passed.
    #[error("state token expired")]
    Expired,
    /// The token was never issued (or already consumed).
    #[error("state token unknown")]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateData {
    subscriber_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<String>,
    created_at: String,
}

/// Manages the credential lifecycle for connected accounts.
pub struct CredentialManager {
    accounts: Arc<AccountRepository>,
    cipher: Arc<TokenCipher>,
    oauth: OAuthClient,
    kv: Arc<dyn KeyValueStore>,
}

impl CredentialManager {
    /// Creates a manager over the given repository, cipher, OAuth client,
    /// and state store.
    #[must_use]
    pub fn new(
        accounts: Arc<AccountRepository>,
        cipher: Arc<TokenCipher>,
        oauth: OAuthClient,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            accounts,
            cipher,
            oauth,
            kv,
        }
    }

    /// Builds the authorization URL for a subscriber, binding a fresh
    /// single-use CSRF state token to them.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    pub async fn authorize(
        &self,
        subscriber: SubscriberId,
        redirect_to: Option<&str>,
    ) -> Result<Url> {
        let state = generate_state();
        let data = StateData {
            subscriber_id: subscriber.0,
            redirect_to: redirect_to.map(ToString::to_string),
            created_at: Utc::now().to_rfc3339(),
        };

        self.kv
            .put(
                &format!("{STATE_PREFIX}{state}"),
                &serde_json::to_string(&data)?,
                STATE_TTL,
            )
            .await;

        let flow = AuthorizationCodeFlow::new(self.oauth.clone());
        let url = flow.authorization_url(None, Some(&state))?;

        info!("Generated authorization URL for subscriber {subscriber}");
        Ok(url)
    }

    /// Completes the authorization callback: validates and consumes the
    /// state token, exchanges the code, resolves the mailbox address, and
    /// stores the encrypted tokens (update-in-place when the subscriber
    /// already connected this mailbox).
    ///
    /// # Errors
    ///
    /// Returns a typed [`StateTokenError`] for rejected state, or the
    /// OAuth/storage error otherwise.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
    ) -> Result<(Account, Option<String>)> {
        let key = format!("{STATE_PREFIX}{state}");
        let data = match self.kv.fetch(&key).await {
            Fetched::Hit(raw) => {
                // Single use: consume before the exchange can fail.
                self.kv.remove(&key).await;
                serde_json::from_str::<StateData>(&raw)?
            }
            Fetched::Expired => return Err(StateTokenError::Expired.into()),
            Fetched::Missing => return Err(StateTokenError::Unknown.into()),
        };

        let subscriber = SubscriberId::new(data.subscriber_id);

        let flow = AuthorizationCodeFlow::new(self.oauth.clone());
        let token = flow.exchange_code(code, None).await?;
        let email = self.oauth.userinfo_email(&token.access_token).await?;

        let access_token_enc = self.cipher.encrypt(&token.access_token)?;
        let refresh_token_enc = token
            .refresh_token
            .as_deref()
            .map(|t| self.cipher.encrypt(t))
            .transpose()?;

        let account = self
            .accounts
            .upsert(NewAccount {
                subscriber_id: subscriber,
                email: email.clone(),
                provider: "gmail".to_string(),
                access_token_enc,
                refresh_token_enc,
                token_expires_at: token.expires_at,
            })
            .await?;

        info!("Connected mailbox {email} for subscriber {subscriber}");
        Ok((account, data.redirect_to))
    }

    /// Returns a decrypted, non-expired access token for the account,
    /// transparently refreshing when the stored expiry has passed.
    ///
    /// # Errors
    ///
    /// Returns an error when no credentials are stored, decryption fails,
    /// or a needed refresh fails.
    pub async fn valid_access_token(&self, account: &Account) -> Result<String> {
        let Some(encrypted) = account.access_token_enc.as_deref() else {
            return Err(Error::MissingCredentials(account.id));
        };

        if account.token_expired(Utc::now()) {
            return self.refresh(account).await;
        }

        Ok(self.cipher.decrypt(encrypted)?)
    }

    /// Exchanges the stored refresh token for a new access token, storing
    /// the result. On any failure the account is deactivated and a terminal
    /// error returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefreshFailed`] after deactivating the account.
    pub async fn refresh(&self, account: &Account) -> Result<String> {
        let Some(refresh_enc) = account.refresh_token_enc.as_deref() else {
            self.accounts.deactivate(account.id).await?;
            return Err(Error::RefreshFailed(format!(
                "no refresh token stored for {}",
                account.email
            )));
        };

        let refresh_token = self.cipher.decrypt(refresh_enc)?;
        let stale = Token::new(String::new(), "Bearer").with_refresh_token(refresh_token);

        let fresh = match self.oauth.refresh_token(&stale).await {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    "Token refresh failed for {}, deactivating account: {e}",
                    account.email
                );
                self.accounts.deactivate(account.id).await?;
                return Err(Error::RefreshFailed(e.to_string()));
            }
        };

        let access_token_enc = self.cipher.encrypt(&fresh.access_token)?;
        self.accounts
            .store_access_token(account.id, &access_token_enc, fresh.expires_at)
            .await?;

        info!("Refreshed access token for {}", account.email);
        Ok(fresh.access_token)
    }

    /// Best-effort revokes the token with the provider, then deletes the
    /// account regardless of the revocation outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local deletion fails.
    pub async fn revoke(&self, account: &Account) -> Result<()> {
        if let Some(encrypted) = account.access_token_enc.as_deref() {
            match self.cipher.decrypt(encrypted) {
                Ok(access_token) => {
                    if let Err(e) = self.oauth.revoke_token(&access_token).await {
                        warn!("Provider revocation failed for {}: {e}", account.email);
                    }
                }
                Err(e) => warn!("Could not decrypt token for revocation: {e}"),
            }
        }

        self.accounts.delete(account.id).await?;
        info!("Deleted account {}", account.email);
        Ok(())
    }
}

/// Random url-safe state token (32 bytes of entropy).
fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
