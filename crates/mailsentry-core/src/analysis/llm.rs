//! Completion client for the analysis and draft stages.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Errors from a completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API.
    #[error("Completion API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },

    /// Response carried no usable content.
    #[error("Empty completion response")]
    Empty,
}

/// Chat-completion backend used by the workflow stages.
///
/// The production implementation is [`MistralClient`]; tests substitute
/// scripted stubs behind this trait.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Runs one completion with a system prompt and a single user prompt,
    /// returning the raw assistant text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, CompletionError>;
}

/// Mistral chat-completions client.
pub struct MistralClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl MistralClient {
    /// Creates a client for the given API key and model.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            temperature,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (used against a local test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns a copy tuned for draft generation (higher temperature for
    /// more varied phrasing).
    #[must_use]
    pub fn creative(&self) -> Self {
        Self {
            http: self.http.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: 0.7,
            base_url: self.base_url.clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for MistralClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": prompt },
                ],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(CompletionError::Empty);
        }

        Ok(content)
    }
}

/// Extracts the first complete JSON object from completion text.
///
/// Models wrap JSON in prose or code fences often enough that strict
/// parsing is a losing game; scan to the first balanced `{...}` instead.
#[must_use]
pub fn first_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..=start + offset];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_object() {
        let value = first_json_object(r#"{"sentiment": "negative"}"#).unwrap();
        assert_eq!(value["sentiment"], "negative");
    }

    #[test]
    fn extracts_object_from_code_fence() {
        let text = "Here you go:\n```json\n{\"priority\": \"critical\"}\n```\nanything else?";
        let value = first_json_object(text).unwrap();
        assert_eq!(value["priority"], "critical");
    }

    #[test]
    fn extracts_nested_object() {
        let text = r#"{"outer": {"inner": [1, 2]}} trailing"#;
        let value = first_json_object(text).unwrap();
        assert_eq!(value["outer"]["inner"][1], 2);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let text = r#"{"summary": "loves the {product}"}"#;
        let value = first_json_object(text).unwrap();
        assert_eq!(value["summary"], "loves the {product}");
    }

    #[test]
    fn no_object_yields_none() {
        assert!(first_json_object("plain prose, no json").is_none());
        assert!(first_json_object("{unclosed").is_none());
    }
}
