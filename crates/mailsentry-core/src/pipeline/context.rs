//! Service handles shared by the pipeline tasks.

use std::sync::Arc;

use crate::account::AccountRepository;
use crate::analysis::Analyzer;
use crate::credential::CredentialManager;
use crate::draft::{DraftGenerator, DraftRepository};
use crate::mailbox::MailboxProvider;
use crate::notify::Dispatcher;
use crate::review::ReviewRepository;
use crate::settings::SettingsRepository;
use crate::subscriber::SubscriberRepository;
use crate::usage::UsageTracker;

use super::queue::TaskQueue;

/// Explicitly injected dependencies for task execution.
///
/// Every task receives this bundle instead of reaching into ambient global
/// state; construction happens once at startup (or per test).
pub struct PipelineContext {
    /// Account storage.
    pub accounts: Arc<AccountRepository>,
    /// Review storage.
    pub reviews: Arc<ReviewRepository>,
    /// Draft storage.
    pub drafts: Arc<DraftRepository>,
    /// Subscriber storage.
    pub subscribers: Arc<SubscriberRepository>,
    /// Notification settings and responder profiles.
    pub settings: Arc<SettingsRepository>,
    /// Credential lifecycle manager.
    pub credentials: Arc<CredentialManager>,
    /// Provider mailbox access.
    pub mailbox: Arc<dyn MailboxProvider>,
    /// Analysis workflow.
    pub analyzer: Arc<Analyzer>,
    /// Draft generator.
    pub generator: Arc<DraftGenerator>,
    /// Notification dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Usage counters.
    pub usage: Arc<UsageTracker>,
    /// Shared task queue for fan-out.
    pub queue: TaskQueue,
    /// Messages fetched per ingestion run.
    pub ingest_page_size: u32,
}
