//! Review model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Unique identifier for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub i64);

impl ReviewId {
    /// Create a new review ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sentiment classification of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// The customer is satisfied.
    Positive,
    /// Complaint or claim.
    Negative,
    /// Informational or indeterminate.
    #[default]
    Neutral,
}

impl Sentiment {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// Handling priority of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Routine message.
    #[default]
    Normal,
    /// Needs attention soon.
    Important,
    /// Urgent: churn risk, legal exposure, or widespread problem.
    Critical,
}

impl Priority {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Self::Critical,
            "important" => Self::Important,
            _ => Self::Normal,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Normal => "normal",
        }
    }
}

/// One ingested message plus its analysis outcome.
#[derive(Debug, Clone)]
pub struct Review {
    /// Unique identifier.
    pub id: ReviewId,
    /// Owning account.
    pub account_id: AccountId,
    /// Provider message ID; unique together with the account.
    pub message_id: String,
    /// Sender address.
    pub sender_email: String,
    /// Sender display name, when known.
    pub sender_name: Option<String>,
    /// Message subject.
    pub subject: String,
    /// Receipt time.
    pub received_at: DateTime<Utc>,
    /// Classified sentiment, once analyzed.
    pub sentiment: Option<Sentiment>,
    /// Derived priority, once analyzed.
    pub priority: Option<Priority>,
    /// Analysis summary (or a bounded failure note after retry exhaustion).
    pub summary: Option<String>,
    /// Extracted problems.
    pub problems: Vec<String>,
    /// Extracted suggestions.
    pub suggestions: Vec<String>,
    /// Whether analysis has completed (successfully or terminally).
    pub is_processed: bool,
    /// When analysis completed.
    pub processed_at: Option<DateTime<Utc>>,
    /// When the review row was created.
    pub created_at: DateTime<Utc>,
}

/// Parameters for recording a newly ingested message.
#[derive(Debug, Clone)]
pub struct NewReview {
    /// Owning account.
    pub account_id: AccountId,
    /// Provider message ID.
    pub message_id: String,
    /// Sender address.
    pub sender_email: String,
    /// Sender display name, when known.
    pub sender_name: Option<String>,
    /// Message subject.
    pub subject: String,
    /// Receipt time.
    pub received_at: DateTime<Utc>,
}

/// Analysis fields applied to a review when the workflow completes.
#[derive(Debug, Clone)]
pub struct AnalysisUpdate {
    /// Classified sentiment.
    pub sentiment: Sentiment,
    /// Derived priority.
    pub priority: Priority,
    /// Summary text.
    pub summary: String,
    /// Extracted problems.
    pub problems: Vec<String>,
    /// Extracted suggestions.
    pub suggestions: Vec<String>,
}
