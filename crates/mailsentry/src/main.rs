//! `MailSentry` - mailbox review monitoring daemon.
//!
//! Polls connected mailboxes on their check intervals, runs the staged
//! analysis workflow over new messages, and fans out prioritized alerts
//! and response drafts.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailsentry_core::account::AccountRepository;
use mailsentry_core::analysis::{Analyzer, MistralClient};
use mailsentry_core::credential::CredentialManager;
use mailsentry_core::draft::{DraftGenerator, DraftRepository};
use mailsentry_core::kv::MemoryStore;
use mailsentry_core::mailbox::ProviderMailbox;
use mailsentry_core::notify::{
    Dispatcher, EmailChannel, NotificationChannel, SmsChannel, TelegramChannel,
};
use mailsentry_core::pipeline::{self, PipelineContext, TaskQueue};
use mailsentry_core::review::ReviewRepository;
use mailsentry_core::settings::SettingsRepository;
use mailsentry_core::subscriber::SubscriberRepository;
use mailsentry_core::usage::UsageTracker;
use mailsentry_core::{Settings, TokenCipher};
use mailsentry_oauth::{OAuthClient, Provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsentry=debug,mailsentry_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MailSentry");

    let settings = Settings::from_env().context("configuration")?;
    let (ctx, queue_rx) = build_context(&settings).await.context("startup wiring")?;
    let shutdown = CancellationToken::new();

    let scheduler = tokio::spawn(pipeline::run_scheduler(
        ctx.clone(),
        settings.scheduler_interval,
        shutdown.clone(),
    ));
    let workers = tokio::spawn(pipeline::run_workers(
        ctx,
        queue_rx,
        settings.worker_count,
        settings.task_timeout,
        shutdown.clone(),
    ));

    tokio::signal::ctrl_c().await.context("signal handler")?;
    info!("Shutdown requested");
    shutdown.cancel();

    let _ = scheduler.await;
    let _ = workers.await;

    info!("MailSentry stopped");
    Ok(())
}

/// Constructs every service handle with explicit dependency injection.
async fn build_context(
    settings: &Settings,
) -> anyhow::Result<(Arc<PipelineContext>, pipeline::TaskReceiver)> {
    let db = settings.database_path.as_str();
    let accounts = Arc::new(AccountRepository::new(db).await?);
    let reviews = Arc::new(ReviewRepository::new(db).await?);
    let drafts = Arc::new(DraftRepository::new(db).await?);
    let subscribers = Arc::new(SubscriberRepository::new(db).await?);
    let settings_repo = Arc::new(SettingsRepository::new(db).await?);

    let cipher = Arc::new(TokenCipher::from_key(&settings.token_encryption_key)?);
    let kv = Arc::new(MemoryStore::new());

    let provider = Provider::google()?;
    let oauth = OAuthClient::new(&settings.google_client_id, provider)
        .with_client_secret(&settings.google_client_secret)
        .with_redirect_uri(&settings.google_redirect_uri);
    let credentials = Arc::new(CredentialManager::new(
        accounts.clone(),
        cipher,
        oauth,
        kv.clone(),
    ));

    let completion = MistralClient::new(
        &settings.mistral_api_key,
        &settings.ai_model,
        settings.ai_max_tokens,
        settings.ai_temperature,
    );
    let generator = Arc::new(DraftGenerator::new(Arc::new(completion.creative())));
    let analyzer = Arc::new(Analyzer::new(Arc::new(completion)));

    let channels: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(EmailChannel::new(
            &settings.sendgrid_api_key,
            &settings.notification_from_email,
        )),
        Arc::new(TelegramChannel::new(&settings.telegram_bot_token)),
        Arc::new(SmsChannel::new(
            &settings.twilio_account_sid,
            &settings.twilio_auth_token,
            &settings.twilio_phone_number,
        )),
    ];
    let dispatcher = Arc::new(Dispatcher::new(channels, &settings.dashboard_url));

    let (queue, rx) = TaskQueue::channel();

    let ctx = Arc::new(PipelineContext {
        accounts,
        reviews,
        drafts,
        subscribers,
        settings: settings_repo,
        credentials: credentials.clone(),
        mailbox: Arc::new(ProviderMailbox::new(credentials)),
        analyzer,
        generator,
        dispatcher,
        usage: Arc::new(UsageTracker::new(kv)),
        queue,
        ingest_page_size: settings.ingest_page_size,
    });

    Ok((ctx, rx))
}
