//! Workflow orchestrator.

use std::sync::Arc;

use tracing::info;

use super::llm::CompletionClient;
use super::stages;
use super::state::{AnalysisState, StageOutcome};
use crate::review::{AnalysisUpdate, Priority, Sentiment};

/// Final result of one workflow invocation.
#[derive(Debug, Clone)]
pub struct ReviewAnalysis {
    /// Classified sentiment.
    pub sentiment: Sentiment,
    /// Derived priority, after escalation rules.
    pub priority: Priority,
    /// Summary text.
    pub summary: String,
    /// Extracted problems.
    pub problems: Vec<String>,
    /// Extracted suggestions.
    pub suggestions: Vec<String>,
    /// Extracted customer name.
    pub customer_name: Option<String>,
    /// Whether a company response is required, after forcing rules.
    pub requires_response: bool,
    /// Stages that degraded to their defaults during this run.
    pub degraded_stages: Vec<&'static str>,
}

impl ReviewAnalysis {
    /// Converts the result into the persistable review update.
    #[must_use]
    pub fn to_update(&self) -> AnalysisUpdate {
        AnalysisUpdate {
            sentiment: self.sentiment,
            priority: self.priority,
            summary: self.summary.clone(),
            problems: self.problems.clone(),
            suggestions: self.suggestions.clone(),
        }
    }
}

/// Runs the fixed analysis stage sequence.
pub struct Analyzer {
    client: Arc<dyn CompletionClient>,
}

impl Analyzer {
    /// Creates an analyzer over the given completion backend.
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Full analysis: every stage, in order.
    pub async fn analyze(&self, review_text: &str, subject: &str) -> ReviewAnalysis {
        let mut state = AnalysisState::new(review_text, subject);
        state.cleaned_text = stages::preprocess(&state.review_text);

        let client = self.client.as_ref();

        let outcome = stages::classify_sentiment(client, &state).await;
        let sentiment = state.record("sentiment", outcome);
        state.sentiment = Some(sentiment);

        let outcome = stages::extract_problems(client, &state).await;
        let problems = state.record("problems", outcome);
        state.problems = Some(problems);

        let outcome = stages::extract_suggestions(client, &state).await;
        let suggestions = state.record("suggestions", outcome);
        state.suggestions = Some(suggestions);

        let outcome = stages::summarize(client, &state).await;
        let summary = state.record("summary", outcome);
        state.summary = Some(summary);

        let outcome = stages::determine_priority(client, &state).await;
        let priority = state.record("priority", outcome);
        state.priority = Some(priority);

        let outcome = stages::extract_customer_name(client, &state).await;
        state.customer_name = state.record("customer_name", outcome);

        let outcome = stages::decide_response(client, &state).await;
        let requires_response = state.record("requires_response", outcome);
        state.requires_response = Some(requires_response);

        let analysis = finalize(state);
        info!(
            "Analysis complete: sentiment={}, priority={}, requires_response={}",
            analysis.sentiment.as_str(),
            analysis.priority.as_str(),
            analysis.requires_response
        );
        analysis
    }

    /// Basic analysis for the free tier: preprocessing and sentiment only,
    /// with priority derived directly from sentiment.
    pub async fn analyze_basic(&self, review_text: &str, subject: &str) -> ReviewAnalysis {
        let mut state = AnalysisState::new(review_text, subject);
        state.cleaned_text = stages::preprocess(&state.review_text);

        let outcome = stages::classify_sentiment(self.client.as_ref(), &state).await;
        let sentiment = state.record("sentiment", outcome);
        state.sentiment = Some(sentiment);

        state.priority = Some(match sentiment {
            Sentiment::Negative => Priority::Important,
            _ => Priority::Normal,
        });
        state.summary = Some(stages::fallback_summary(&state.cleaned_text));
        state.requires_response = Some(sentiment == Sentiment::Negative);

        finalize(state)
    }
}

/// Applies the deterministic post-rules and compiles the final result.
///
/// Regardless of what the stages produced: a negative review is escalated
/// to at least important, and negative sentiment or critical priority
/// forces a required response.
fn finalize(state: AnalysisState) -> ReviewAnalysis {
    let sentiment = state.sentiment.unwrap_or_default();

    let mut priority = state.priority.unwrap_or_default();
    if sentiment == Sentiment::Negative && priority == Priority::Normal {
        priority = Priority::Important;
    }

    let mut requires_response = state.requires_response.unwrap_or(true);
    if sentiment == Sentiment::Negative || priority == Priority::Critical {
        requires_response = true;
    }

    let summary = state
        .summary
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| stages::fallback_summary(&state.cleaned_text));

    ReviewAnalysis {
        sentiment,
        priority,
        summary,
        problems: state.problems.unwrap_or_default(),
        suggestions: state.suggestions.unwrap_or_default(),
        customer_name: state.customer_name,
        requires_response,
        degraded_stages: state.degraded_stages,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analysis::llm::{CompletionClient, CompletionError};
    use async_trait::async_trait;

    /// Scripted backend keyed on the stage's leading prompt phrase.
    struct ScriptedClient {
        sentiment: &'static str,
        priority: &'static str,
        requires_response: bool,
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, CompletionError> {
            let response = if prompt.starts_with("Classify the sentiment") {
                format!(r#"{{"sentiment": "{}"}}"#, self.sentiment)
            } else if prompt.starts_with("List the specific problems") {
                r#"{"problems": ["late delivery"]}"#.to_string()
            } else if prompt.starts_with("List the suggestions") {
                r#"{"suggestions": []}"#.to_string()
            } else if prompt.starts_with("Summarize") {
                r#"{"summary": "Customer reports a late delivery."}"#.to_string()
            } else if prompt.starts_with("Determine the handling priority") {
                format!(r#"{{"priority": "{}"}}"#, self.priority)
            } else if prompt.starts_with("Extract the customer's name") {
                r#"{"customer_name": "Dana"}"#.to_string()
            } else if prompt.starts_with("Decide whether") {
                format!(r#"{{"requires_response": {}}}"#, self.requires_response)
            } else {
                return Err(CompletionError::Empty);
            };
            Ok(response)
        }
    }

    /// Backend that fails every call.
    struct DownClient;

    #[async_trait]
    impl CompletionClient for DownClient {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            })
        }
    }

    fn analyzer(client: impl CompletionClient + 'static) -> Analyzer {
        Analyzer::new(Arc::new(client))
    }

    #[tokio::test]
    async fn full_analysis_collects_all_stages() {
        let analyzer = analyzer(ScriptedClient {
            sentiment: "positive",
            priority: "normal",
            requires_response: false,
        });

        let result = analyzer.analyze("Great service, thank you!", "Thanks").await;
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.priority, Priority::Normal);
        assert_eq!(result.summary, "Customer reports a late delivery.");
        assert_eq!(result.problems, vec!["late delivery".to_string()]);
        assert_eq!(result.customer_name.as_deref(), Some("Dana"));
        assert!(!result.requires_response);
        assert!(result.degraded_stages.is_empty());
    }

    #[tokio::test]
    async fn negative_normal_is_escalated_to_important() {
        let analyzer = analyzer(ScriptedClient {
            sentiment: "negative",
            priority: "normal",
            requires_response: false,
        });

        let result = analyzer.analyze("The box arrived crushed.", "Damaged").await;
        assert_eq!(result.priority, Priority::Important);
        // Negative sentiment also forces the response flag.
        assert!(result.requires_response);
    }

    #[tokio::test]
    async fn critical_priority_forces_response() {
        let analyzer = analyzer(ScriptedClient {
            sentiment: "neutral",
            priority: "critical",
            requires_response: false,
        });

        let result = analyzer.analyze("Your product set my kitchen on fire.", "!!").await;
        assert_eq!(result.priority, Priority::Critical);
        assert!(result.requires_response);
    }

    #[tokio::test]
    async fn every_stage_falls_back_when_backend_is_down() {
        let analyzer = analyzer(DownClient);

        let text = "word ".repeat(100);
        let result = analyzer.analyze(&text, "Subject").await;

        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.priority, Priority::Normal);
        assert!(result.problems.is_empty());
        assert!(result.suggestions.is_empty());
        assert!(result.customer_name.is_none());
        // Safe default: when in doubt, respond.
        assert!(result.requires_response);
        // Summary degrades to truncated source text.
        assert!(result.summary.starts_with("word word"));
        assert_eq!(result.degraded_stages.len(), 7);
    }

    #[tokio::test]
    async fn basic_analysis_skips_extraction_stages() {
        let analyzer = analyzer(ScriptedClient {
            sentiment: "negative",
            priority: "critical", // would only matter in full mode
            requires_response: false,
        });

        let result = analyzer.analyze_basic("Terrible!", "Bad").await;
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert_eq!(result.priority, Priority::Important);
        assert!(result.problems.is_empty());
        assert!(result.suggestions.is_empty());
        assert!(result.customer_name.is_none());
        assert!(result.requires_response);
        assert_eq!(result.summary, "Terrible!");
    }

    #[tokio::test]
    async fn basic_analysis_neutral_needs_no_response() {
        let analyzer = analyzer(ScriptedClient {
            sentiment: "neutral",
            priority: "normal",
            requires_response: true,
        });

        let result = analyzer.analyze_basic("What are your opening hours?", "Hours").await;
        assert_eq!(result.priority, Priority::Normal);
        assert!(!result.requires_response);
    }
}
