//! Task pipeline.
//!
//! Scheduler → ingestion → analysis → notification/drafts, coordinated
//! over a shared queue drained by a worker pool. Tasks are the unit of
//! retry and every body is idempotent.

mod analyze;
mod context;
mod deliver;
mod ingest;
mod queue;
mod respond;
mod retry;
mod scheduler;

pub use analyze::analyze_review;
pub use context::PipelineContext;
pub use deliver::deliver_notification;
pub use ingest::{IngestOutcome, ingest_account};
pub use queue::{Task, TaskQueue, TaskReceiver, execute, run_workers};
pub use respond::generate_drafts;
pub use retry::{RetryPolicy, TaskFailure, run_with_retry};
pub use scheduler::{dispatch_due_accounts, run_scheduler};
