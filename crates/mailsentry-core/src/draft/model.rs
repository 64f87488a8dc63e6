//! Draft model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::review::ReviewId;

/// Unique identifier for a draft response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(pub i64);

impl DraftId {
    /// Create a new draft ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tone of a generated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseTone {
    /// Formal business register.
    Formal,
    /// Warm, conversational register.
    Friendly,
    /// Professional but not stiff.
    #[default]
    Professional,
}

impl ResponseTone {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "formal" => Self::Formal,
            "friendly" => Self::Friendly,
            _ => Self::Professional,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Friendly => "friendly",
            Self::Professional => "professional",
        }
    }

    /// Style guidance embedded in generation prompts.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Formal => "Formal business register; address the customer respectfully.",
            Self::Friendly => "Warm and conversational; first names are fine where natural.",
            Self::Professional => "Professional but personable; courteous without being stiff.",
        }
    }
}

/// One stored response-draft variant for a review.
#[derive(Debug, Clone)]
pub struct DraftResponse {
    /// Unique identifier.
    pub id: DraftId,
    /// Review this draft answers.
    pub review_id: ReviewId,
    /// Draft text.
    pub content: String,
    /// Tone the draft was generated with.
    pub tone: ResponseTone,
    /// 1-based variant number.
    pub variant_number: u32,
    /// When the draft was created.
    pub created_at: DateTime<Utc>,
}

/// A draft pending storage.
#[derive(Debug, Clone)]
pub struct NewDraft {
    /// Draft text.
    pub content: String,
    /// Tone the draft was generated with.
    pub tone: ResponseTone,
    /// 1-based variant number.
    pub variant_number: u32,
}
