//! Workflow state threaded through the stage sequence.

use crate::review::{Priority, Sentiment};

/// Result of one analysis stage.
///
/// Stages never abort the workflow; a failed stage yields its safe default
/// wrapped in `Fallback` so "this stage degraded" is an inspectable outcome
/// rather than a swallowed exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome<T> {
    /// The stage produced a real result.
    Produced(T),
    /// The stage failed and substituted its default.
    Fallback {
        /// The substituted default.
        value: T,
        /// Why the stage fell back.
        reason: String,
    },
}

impl<T> StageOutcome<T> {
    /// Unwraps the carried value, produced or fallback.
    pub fn into_value(self) -> T {
        match self {
            Self::Produced(value) | Self::Fallback { value, .. } => value,
        }
    }

    /// Whether the stage degraded to its default.
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Transient record threaded through one workflow invocation.
///
/// Never persisted; each stage reads the fields filled so far and the
/// orchestrator merges the stage's partial update before the next stage
/// runs.
#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    /// Raw message body.
    pub review_text: String,
    /// Message subject.
    pub subject: String,
    /// Normalized, length-capped text produced by preprocessing.
    pub cleaned_text: String,
    /// Classified sentiment.
    pub sentiment: Option<Sentiment>,
    /// Extracted problems.
    pub problems: Option<Vec<String>>,
    /// Extracted suggestions.
    pub suggestions: Option<Vec<String>>,
    /// Generated summary.
    pub summary: Option<String>,
    /// Derived priority.
    pub priority: Option<Priority>,
    /// Extracted customer name.
    pub customer_name: Option<String>,
    /// Whether the review needs a company response.
    pub requires_response: Option<bool>,
    /// Names of stages that fell back to their default.
    pub degraded_stages: Vec<&'static str>,
}

impl AnalysisState {
    /// Creates the initial state for one invocation.
    #[must_use]
    pub fn new(review_text: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            review_text: review_text.into(),
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Records a stage outcome, noting degradation.
    pub fn record<T>(&mut self, stage: &'static str, outcome: StageOutcome<T>) -> T {
        if outcome.is_fallback() {
            self.degraded_stages.push(stage);
        }
        outcome.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produced_is_not_fallback() {
        let outcome = StageOutcome::Produced(Sentiment::Positive);
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.into_value(), Sentiment::Positive);
    }

    #[test]
    fn fallback_carries_value_and_is_recorded() {
        let mut state = AnalysisState::new("text", "subject");
        let value = state.record(
            "sentiment",
            StageOutcome::Fallback {
                value: Sentiment::Neutral,
                reason: "completion unavailable".to_string(),
            },
        );
        assert_eq!(value, Sentiment::Neutral);
        assert_eq!(state.degraded_stages, vec!["sentiment"]);
    }
}
