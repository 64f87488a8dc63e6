//! Rule-based response templates.
//!
//! Used whenever the completion backend cannot produce a draft: the caller
//! must always receive the requested number of variants, generated or
//! templated.

use crate::review::Sentiment;

/// Issue bucket chosen by the keyword classifier over the problem list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Shipping or courier trouble.
    Delivery,
    /// Product quality or defects.
    Quality,
    /// A positive review with no problems.
    PositiveFeedback,
    /// Anything else.
    General,
}

impl IssueKind {
    /// Classifies a review's problems into a template bucket.
    #[must_use]
    pub fn detect(problems: &[String], sentiment: Sentiment) -> Self {
        if problems.is_empty() && sentiment == Sentiment::Positive {
            return Self::PositiveFeedback;
        }

        let joined = problems.join(" ").to_lowercase();

        const DELIVERY_MARKERS: [&str; 5] = ["deliver", "courier", "shipping", "late", "delay"];
        if DELIVERY_MARKERS.iter().any(|m| joined.contains(m)) {
            return Self::Delivery;
        }

        const QUALITY_MARKERS: [&str; 6] =
            ["quality", "defect", "broken", "damaged", "faulty", "not working"];
        if QUALITY_MARKERS.iter().any(|m| joined.contains(m)) {
            return Self::Quality;
        }

        if sentiment == Sentiment::Positive {
            return Self::PositiveFeedback;
        }

        Self::General
    }
}

/// Renders the template for an issue bucket.
#[must_use]
pub fn render(kind: IssueKind, customer_name: Option<&str>, company_name: &str) -> String {
    let greeting = customer_name.map_or_else(String::new, |name| format!(", {name}"));

    match kind {
        IssueKind::Delivery => format!(
            "Hello{greeting},\n\n\
             Thank you for reaching out, and our apologies for the delayed \
             delivery. We have already contacted our logistics partner to \
             find out what went wrong.\n\n\
             Kind regards,\n{company_name}"
        ),
        IssueKind::Quality => format!(
            "Hello{greeting},\n\n\
             Thank you for your feedback, and we are sorry the product did \
             not meet your expectations. We take quality seriously and would \
             like to look into what happened.\n\n\
             Kind regards,\n{company_name}"
        ),
        IssueKind::PositiveFeedback => format!(
            "Hello{greeting},\n\n\
             Thank you so much for your kind words! We are delighted you had \
             a good experience, and your feedback motivates us to keep \
             improving.\n\n\
             Kind regards,\n{company_name}"
        ),
        IssueKind::General => format!(
            "Hello{greeting},\n\n\
             Thank you for contacting us. We appreciate your feedback and \
             will get back to you as soon as possible.\n\n\
             Kind regards,\n{company_name}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn delivery_keywords_pick_delivery() {
        let kind = IssueKind::detect(&problems(&["late delivery"]), Sentiment::Negative);
        assert_eq!(kind, IssueKind::Delivery);
    }

    #[test]
    fn quality_keywords_pick_quality() {
        let kind = IssueKind::detect(&problems(&["item arrived broken"]), Sentiment::Negative);
        assert_eq!(kind, IssueKind::Quality);
    }

    #[test]
    fn positive_without_problems_is_positive_feedback() {
        let kind = IssueKind::detect(&[], Sentiment::Positive);
        assert_eq!(kind, IssueKind::PositiveFeedback);
    }

    #[test]
    fn unmatched_negative_is_general() {
        let kind = IssueKind::detect(&problems(&["rude phone support"]), Sentiment::Negative);
        assert_eq!(kind, IssueKind::General);
    }

    #[test]
    fn render_personalizes_greeting() {
        let text = render(IssueKind::General, Some("Dana"), "Acme");
        assert!(text.starts_with("Hello, Dana,"));
        assert!(text.ends_with("Acme"));

        let anonymous = render(IssueKind::General, None, "Acme");
        assert!(anonymous.starts_with("Hello,\n"));
    }
}
