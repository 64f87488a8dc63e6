//! Mailbox access seam.
//!
//! Pipeline tasks talk to the provider through this trait so tests can
//! script pages and failures. The production implementation resolves a
//! valid access token per call through the credential manager and builds a
//! fresh API client from it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailsentry_gmail::{GmailClient, MessageDetail, MessageSummary};

use crate::Result;
use crate::account::Account;
use crate::credential::CredentialManager;

/// Provider mail access for one account at a time.
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    /// Fetches up to `limit` inbox messages received after `after`.
    async fn fetch_page(
        &self,
        account: &Account,
        after: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<MessageSummary>>;

    /// Fetches the full detail of one message.
    async fn fetch_detail(&self, account: &Account, message_id: &str) -> Result<MessageDetail>;

    /// Marks a message as read.
    async fn mark_read(&self, account: &Account, message_id: &str) -> Result<()>;
}

/// Credential-aware Gmail-backed implementation.
pub struct ProviderMailbox {
    credentials: Arc<CredentialManager>,
}

impl ProviderMailbox {
    /// Creates the mailbox over the credential manager.
    #[must_use]
    pub const fn new(credentials: Arc<CredentialManager>) -> Self {
        Self { credentials }
    }

    async fn client(&self, account: &Account) -> Result<GmailClient> {
        let token = self.credentials.valid_access_token(account).await?;
        Ok(GmailClient::new(token))
    }
}

#[async_trait]
impl MailboxProvider for ProviderMailbox {
    async fn fetch_page(
        &self,
        account: &Account,
        after: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<MessageSummary>> {
        let client = self.client(account).await?;
        Ok(client.list_messages(after, limit).await?)
    }

    async fn fetch_detail(&self, account: &Account, message_id: &str) -> Result<MessageDetail> {
        let client = self.client(account).await?;
        Ok(client.get_message(message_id).await?)
    }

    async fn mark_read(&self, account: &Account, message_id: &str) -> Result<()> {
        let client = self.client(account).await?;
        Ok(client.mark_as_read(message_id).await?)
    }
}
