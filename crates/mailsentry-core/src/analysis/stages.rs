//! Individual analysis stages.
//!
//! Each stage reads the state filled so far and returns a [`StageOutcome`]
//! holding either its real result or its documented safe default. Stage
//! failures never propagate.

use tracing::warn;

use super::llm::{CompletionClient, first_json_object};
use super::prompts;
use super::state::{AnalysisState, StageOutcome};
use crate::review::{Priority, Sentiment};

/// Length cap applied to cleaned review text before it reaches a prompt.
const MAX_TEXT_CHARS: usize = 4000;

/// Length cap for fallback summaries.
const SUMMARY_TRUNCATE_CHARS: usize = 200;

/// Normalizes review text: strips markup tags, collapses whitespace, and
/// caps the length to keep prompts inside the model's budget.
#[must_use]
pub fn preprocess(text: &str) -> String {
    let mut without_tags = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => without_tags.push(c),
            _ => {}
        }
    }

    let collapsed = without_tags.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, MAX_TEXT_CHARS)
}

/// Truncated-source-text summary used when summarization is unavailable.
#[must_use]
pub fn fallback_summary(cleaned_text: &str) -> String {
    truncate_chars(cleaned_text, SUMMARY_TRUNCATE_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let truncated: String = text.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Classifies sentiment. Default: neutral.
pub async fn classify_sentiment(
    client: &dyn CompletionClient,
    state: &AnalysisState,
) -> StageOutcome<Sentiment> {
    let prompt = prompts::sentiment(&state.subject, &state.cleaned_text);
    match ask(client, &prompt).await {
        Ok(value) => {
            let sentiment = value
                .get("sentiment")
                .and_then(serde_json::Value::as_str)
                .map_or(Sentiment::Neutral, Sentiment::parse);
            StageOutcome::Produced(sentiment)
        }
        Err(reason) => fallback("sentiment", Sentiment::Neutral, reason),
    }
}

/// Extracts problems. Default: empty list.
pub async fn extract_problems(
    client: &dyn CompletionClient,
    state: &AnalysisState,
) -> StageOutcome<Vec<String>> {
    let prompt = prompts::problems(&state.subject, &state.cleaned_text);
    match ask(client, &prompt).await {
        Ok(value) => StageOutcome::Produced(string_list(&value, "problems")),
        Err(reason) => fallback("problems", Vec::new(), reason),
    }
}

/// Extracts suggestions. Default: empty list.
pub async fn extract_suggestions(
    client: &dyn CompletionClient,
    state: &AnalysisState,
) -> StageOutcome<Vec<String>> {
    let prompt = prompts::suggestions(&state.subject, &state.cleaned_text);
    match ask(client, &prompt).await {
        Ok(value) => StageOutcome::Produced(string_list(&value, "suggestions")),
        Err(reason) => fallback("suggestions", Vec::new(), reason),
    }
}

/// Produces a summary. Default: truncated source text.
pub async fn summarize(
    client: &dyn CompletionClient,
    state: &AnalysisState,
) -> StageOutcome<String> {
    let prompt = prompts::summary(&state.subject, &state.cleaned_text);
    match ask(client, &prompt).await {
        Ok(value) => {
            let summary = value
                .get("summary")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if summary.is_empty() {
                StageOutcome::Produced(fallback_summary(&state.cleaned_text))
            } else {
                StageOutcome::Produced(summary.to_string())
            }
        }
        Err(reason) => fallback(
            "summary",
            fallback_summary(&state.cleaned_text),
            reason,
        ),
    }
}

/// Determines priority from the stages before it. Default: normal.
pub async fn determine_priority(
    client: &dyn CompletionClient,
    state: &AnalysisState,
) -> StageOutcome<Priority> {
    let sentiment = state.sentiment.unwrap_or_default();
    let problems = state
        .problems
        .as_deref()
        .filter(|p| !p.is_empty())
        .map_or_else(|| "none".to_string(), |p| p.join(", "));

    let prompt = prompts::priority(
        sentiment.as_str(),
        &problems,
        &state.subject,
        &state.cleaned_text,
    );
    match ask(client, &prompt).await {
        Ok(value) => {
            let priority = value
                .get("priority")
                .and_then(serde_json::Value::as_str)
                .map_or(Priority::Normal, Priority::parse);
            StageOutcome::Produced(priority)
        }
        Err(reason) => fallback("priority", Priority::Normal, reason),
    }
}

/// Extracts the customer's name. Default: absent.
pub async fn extract_customer_name(
    client: &dyn CompletionClient,
    state: &AnalysisState,
) -> StageOutcome<Option<String>> {
    let prompt = prompts::customer_name(&state.cleaned_text);
    match ask(client, &prompt).await {
        Ok(value) => {
            let name = value
                .get("customer_name")
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|n| (2..=100).contains(&n.chars().count()))
                .map(ToString::to_string);
            StageOutcome::Produced(name)
        }
        Err(reason) => fallback("customer_name", None, reason),
    }
}

/// Decides whether a reply is required. Default: true.
pub async fn decide_response(
    client: &dyn CompletionClient,
    state: &AnalysisState,
) -> StageOutcome<bool> {
    let sentiment = state.sentiment.unwrap_or_default();
    let priority = state.priority.unwrap_or_default();

    let prompt = prompts::requires_response(
        sentiment.as_str(),
        priority.as_str(),
        &state.cleaned_text,
    );
    match ask(client, &prompt).await {
        Ok(value) => {
            let required = value
                .get("requires_response")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(true);
            StageOutcome::Produced(required)
        }
        Err(reason) => fallback("requires_response", true, reason),
    }
}

/// Runs one completion and extracts its JSON object.
async fn ask(
    client: &dyn CompletionClient,
    prompt: &str,
) -> Result<serde_json::Value, String> {
    let response = client
        .complete(prompts::SYSTEM_PROMPT, prompt)
        .await
        .map_err(|e| e.to_string())?;

    first_json_object(&response).ok_or_else(|| "completion carried no JSON object".to_string())
}

fn string_list(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn fallback<T>(stage: &str, value: T, reason: String) -> StageOutcome<T> {
    warn!("Analysis stage {stage} fell back to its default: {reason}");
    StageOutcome::Fallback { value, reason }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_collapses_whitespace() {
        assert_eq!(preprocess("hello   \n\t world"), "hello world");
    }

    #[test]
    fn preprocess_strips_markup() {
        assert_eq!(
            preprocess("<div><p>broken  item</p></div>"),
            "broken item"
        );
    }

    #[test]
    fn preprocess_caps_length() {
        let long = "word ".repeat(2000);
        let cleaned = preprocess(&long);
        assert!(cleaned.chars().count() <= MAX_TEXT_CHARS + 3);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn fallback_summary_truncates() {
        let text = "a".repeat(500);
        let summary = fallback_summary(&text);
        assert_eq!(summary.chars().count(), SUMMARY_TRUNCATE_CHARS + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn short_text_is_not_padded() {
        assert_eq!(fallback_summary("short note"), "short note");
    }
}
