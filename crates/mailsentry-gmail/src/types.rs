//! Message and label types returned by the Gmail client.

use chrono::{DateTime, Utc};

/// Summary of a fetched inbox message.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    /// Provider message ID.
    pub message_id: String,
    /// Provider thread ID.
    pub thread_id: String,
    /// Sender address.
    pub sender_email: String,
    /// Sender display name, when the From header carried one.
    pub sender_name: Option<String>,
    /// Message subject.
    pub subject: String,
    /// Plain-text body (empty when none could be extracted).
    pub body_text: String,
    /// Receipt time.
    pub received_at: DateTime<Utc>,
    /// Label IDs attached to the message.
    pub labels: Vec<String>,
}

/// Full detail of a single message.
#[derive(Debug, Clone)]
pub struct MessageDetail {
    /// Provider message ID.
    pub message_id: String,
    /// Provider thread ID.
    pub thread_id: String,
    /// Sender address.
    pub sender_email: String,
    /// Sender display name, when the From header carried one.
    pub sender_name: Option<String>,
    /// Message subject (`"(No Subject)"` when absent).
    pub subject: String,
    /// Plain-text body (empty when none could be extracted).
    pub body_text: String,
    /// HTML body, when present.
    pub body_html: Option<String>,
    /// Receipt time.
    pub received_at: DateTime<Utc>,
    /// Label IDs attached to the message.
    pub labels: Vec<String>,
    /// Provider-generated snippet.
    pub snippet: Option<String>,
    /// Attachment metadata.
    pub attachments: Vec<AttachmentInfo>,
}

impl MessageDetail {
    /// Reduces the detail to a listing summary.
    #[must_use]
    pub fn into_summary(self) -> MessageSummary {
        MessageSummary {
            message_id: self.message_id,
            thread_id: self.thread_id,
            sender_email: self.sender_email,
            sender_name: self.sender_name,
            subject: self.subject,
            body_text: self.body_text,
            received_at: self.received_at,
            labels: self.labels,
        }
    }
}

/// Attachment metadata (content is never downloaded by the pipeline).
#[derive(Debug, Clone)]
pub struct AttachmentInfo {
    /// File name as declared by the sender.
    pub filename: String,
    /// MIME type of the part.
    pub mime_type: String,
    /// Size in bytes, when reported.
    pub size: u64,
}

/// A Gmail label.
#[derive(Debug, Clone)]
pub struct Label {
    /// Label ID (e.g. `INBOX`, `UNREAD`, or a user label ID).
    pub id: String,
    /// Display name.
    pub name: String,
}
