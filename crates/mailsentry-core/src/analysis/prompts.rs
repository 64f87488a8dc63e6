//! Prompt templates for the analysis stages.
//!
//! Each stage sends one user prompt and expects a single JSON object back;
//! the keys are stage-specific and validated by the stage function.

/// System prompt shared by all analysis stages.
pub const SYSTEM_PROMPT: &str = "You are an assistant that analyzes customer \
review emails. Extract the key information faithfully and always answer with \
the requested JSON object and nothing else.";

/// Sentiment classification prompt.
pub fn sentiment(subject: &str, text: &str) -> String {
    format!(
        "Classify the sentiment of this customer review:\n\
         - positive: the customer is satisfied, thankful, or complimentary\n\
         - negative: a complaint, claim, or expression of dissatisfaction\n\
         - neutral: an informational request or neutral message\n\n\
         Subject: {subject}\n\nReview text:\n{text}\n\n\
         Answer as JSON:\n{{\"sentiment\": \"positive\" | \"negative\" | \"neutral\"}}"
    )
}

/// Problem extraction prompt.
pub fn problems(subject: &str, text: &str) -> String {
    format!(
        "List the specific problems the customer mentions. Typical areas: \
         delivery, product quality, service, pricing, packaging, returns, \
         communication, other.\n\n\
         Subject: {subject}\n\nReview text:\n{text}\n\n\
         Answer as JSON:\n{{\"problems\": [\"problem 1\", \"problem 2\"]}}\n\n\
         Return an empty list when no problems are mentioned."
    )
}

/// Suggestion extraction prompt.
pub fn suggestions(subject: &str, text: &str) -> String {
    format!(
        "List the suggestions and wishes the customer expresses, such as \
         improvements, new features, or service changes.\n\n\
         Subject: {subject}\n\nReview text:\n{text}\n\n\
         Answer as JSON:\n{{\"suggestions\": [\"suggestion 1\", \"suggestion 2\"]}}\n\n\
         Return an empty list when there are none."
    )
}

/// Summary prompt.
pub fn summary(subject: &str, text: &str) -> String {
    format!(
        "Summarize this customer review in two or three sentences, stating \
         the core of the customer's message.\n\n\
         Subject: {subject}\n\nReview text:\n{text}\n\n\
         Answer as JSON:\n{{\"summary\": \"the summary\"}}"
    )
}

/// Priority prompt; fed the already-classified sentiment and problems.
pub fn priority(sentiment: &str, problems: &str, subject: &str, text: &str) -> String {
    format!(
        "Determine the handling priority of this review:\n\
         - critical: urgent problems, churn risk, legal exposure, or a widespread issue\n\
         - important: significant complaints that need attention, negative reviews\n\
         - normal: routine requests, positive reviews, informational messages\n\n\
         Sentiment: {sentiment}\nProblems: {problems}\n\n\
         Subject: {subject}\n\nReview text:\n{text}\n\n\
         Answer as JSON:\n{{\"priority\": \"critical\" | \"important\" | \"normal\"}}"
    )
}

/// Customer-name extraction prompt.
pub fn customer_name(text: &str) -> String {
    format!(
        "Extract the customer's name from the review text if one is given. \
         Look at signatures, greetings, and self-references.\n\n\
         Review text:\n{text}\n\n\
         Answer as JSON:\n{{\"customer_name\": \"the name\" or null}}"
    )
}

/// Response-required prompt; fed sentiment and priority.
pub fn requires_response(sentiment: &str, priority: &str, text: &str) -> String {
    format!(
        "Decide whether this review requires a reply from the company:\n\
         - true: a question, complaint, request, negative review, or information request\n\
         - false: thanks with no question, informational message with no request\n\n\
         Sentiment: {sentiment}\nPriority: {priority}\n\n\
         Review text:\n{text}\n\n\
         Answer as JSON:\n{{\"requires_response\": true | false}}"
    )
}
