//! Draft generation.

use std::sync::Arc;

use tracing::{info, warn};

use super::model::{NewDraft, ResponseTone};
use super::templates::{self, IssueKind};
use crate::analysis::{CompletionClient, first_json_object};
use crate::review::{Review, Sentiment};
use crate::settings::ResponderProfile;

/// Length cap for review text embedded in the first-variant prompt.
const REVIEW_TEXT_CAP: usize = 2000;

/// Length cap for the previous variant embedded in rephrase prompts.
const PREVIOUS_VARIANT_CAP: usize = 500;

const SYSTEM_PROMPT: &str = "You are an experienced customer-support \
specialist. Write a reply to the customer's review on behalf of the company. \
Be polite, empathetic, and constructive, and always answer with the \
requested JSON object and nothing else.";

const FALLBACK_COMPANY: &str = "The team";

/// Generates response-draft variants for a review.
///
/// Variant 1 is generated from the review content; each subsequent variant
/// rephrases the one before it for lexical diversity. Any generation
/// failure substitutes the rule-based template for the review's issue kind,
/// so the caller always receives the requested number of drafts.
pub struct DraftGenerator {
    client: Arc<dyn CompletionClient>,
}

impl DraftGenerator {
    /// Creates a generator over the given completion backend.
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Produces exactly `variant_count` drafts.
    ///
    /// Callers enforce plan gating before invoking; a `variant_count` of
    /// zero yields an empty set.
    pub async fn generate(
        &self,
        review: &Review,
        review_text: &str,
        profile: &ResponderProfile,
        variant_count: u32,
    ) -> Vec<NewDraft> {
        self.generate_with_tone(review, review_text, profile, profile.response_tone, variant_count)
            .await
    }

    /// Like [`DraftGenerator::generate`] with an explicit tone override
    /// (regeneration path).
    pub async fn generate_with_tone(
        &self,
        review: &Review,
        review_text: &str,
        profile: &ResponderProfile,
        tone: ResponseTone,
        variant_count: u32,
    ) -> Vec<NewDraft> {
        let company = profile.company_name.as_deref().unwrap_or(FALLBACK_COMPANY);
        let sentiment = review.sentiment.unwrap_or_default();

        info!(
            "Generating {variant_count} draft variants for review {}",
            review.id
        );

        let mut drafts: Vec<NewDraft> = Vec::with_capacity(variant_count as usize);
        let mut previous: Option<String> = None;

        for variant in 1..=variant_count {
            let prompt = match &previous {
                None => first_variant_prompt(review, review_text, company, tone, sentiment),
                Some(prior) => rephrase_prompt(prior, tone),
            };

            let content = match self.complete_draft(&prompt).await {
                Some(text) => text,
                None => {
                    warn!(
                        "Draft generation failed for review {} variant {variant}, using template",
                        review.id
                    );
                    let kind = IssueKind::detect(&review.problems, sentiment);
                    templates::render(kind, review.sender_name.as_deref(), company)
                }
            };

            previous = Some(content.clone());
            drafts.push(NewDraft {
                content,
                tone,
                variant_number: variant,
            });
        }

        drafts
    }

    async fn complete_draft(&self, prompt: &str) -> Option<String> {
        let response = self
            .client
            .complete(SYSTEM_PROMPT, prompt)
            .await
            .map_err(|e| warn!("Draft completion failed: {e}"))
            .ok()?;

        first_json_object(&response)
            .and_then(|value| {
                value
                    .get("response")
                    .and_then(serde_json::Value::as_str)
                    .map(ToString::to_string)
            })
            .filter(|text| !text.trim().is_empty())
    }
}

fn first_variant_prompt(
    review: &Review,
    review_text: &str,
    company: &str,
    tone: ResponseTone,
    sentiment: Sentiment,
) -> String {
    let problems = if review.problems.is_empty() {
        "none listed".to_string()
    } else {
        review.problems.join(", ")
    };
    let customer = review.sender_name.as_deref().unwrap_or("not given");
    let text = cap_chars(review_text, REVIEW_TEXT_CAP);

    format!(
        "You represent the company \"{company}\". Write a reply to this \
         customer review.\n\n\
         Reply tone: {}\n\n\
         Customer review:\n{text}\n\n\
         Review analysis:\n\
         - Sentiment: {}\n\
         - Problems: {problems}\n\
         - Customer name: {customer}\n\n\
         Requirements:\n\
         1. Thank the customer for the feedback\n\
         2. Acknowledge the problem, if there is one\n\
         3. Offer a resolution or apologize\n\
         4. Close on a positive note\n\
         5. Length: 3-5 sentences\n\n\
         Answer as JSON:\n{{\"response\": \"the reply text\"}}",
        tone.description(),
        sentiment.as_str(),
    )
}

fn rephrase_prompt(previous: &str, tone: ResponseTone) -> String {
    let prior = cap_chars(previous, PREVIOUS_VARIANT_CAP);

    format!(
        "Write another variant of the reply to the same review. Keep the \
         meaning and tone but change the wording.\n\n\
         Previous variant:\n{prior}\n\n\
         Requirements:\n\
         - Different phrasing\n\
         - Same tone: {}\n\
         - Length: 3-5 sentences\n\n\
         Answer as JSON:\n{{\"response\": \"the reply text\"}}",
        tone.description(),
    )
}

fn cap_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        text.chars().take(max).collect()
    } else {
        text.to_string()
    }
}
