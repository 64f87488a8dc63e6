//! # mailsentry-gmail
//!
//! Gmail REST API client for the `MailSentry` ingestion pipeline.
//!
//! This crate provides:
//! - Message listing with `after:{epoch}` checkpoint queries
//! - Full message detail fetch (headers, bodies, labels, attachments)
//! - Label listing and mark-as-read label mutation
//! - Payload body extraction that prefers the plain-text part and recurses
//!   into nested multipart containers
//! - A three-way error classification (auth / retryable / client) that the
//!   rest of the pipeline relies on to decide retry vs. give-up vs.
//!   deactivate

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod payload;
mod types;

pub use client::GmailClient;
pub use error::{Error, Result};
pub use types::{AttachmentInfo, Label, MessageDetail, MessageSummary};
