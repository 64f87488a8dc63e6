//! Gmail API client.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::payload::{
    self, MessageResource, collect_attachments, extract_body_html, extract_body_text, header_value,
};
use crate::types::{Label, MessageDetail, MessageSummary};

const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Client for one account's mailbox, authenticated with a bearer token.
///
/// The client is cheap to construct; callers build a fresh one per task run
/// from the current access token rather than holding it across refreshes.
pub struct GmailClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct LabelListResponse {
    #[serde(default)]
    labels: Vec<LabelResource>,
}

#[derive(Debug, Deserialize)]
struct LabelResource {
    id: String,
    name: String,
}

impl GmailClient {
    /// Creates a client for the given access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (used against a local test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lists inbox messages, newest page first.
    ///
    /// When `after` is set the query is restricted to messages received
    /// after that instant (epoch-second granularity, the finest the search
    /// syntax supports). Individual detail-fetch failures are logged and
    /// skipped so one bad message cannot sink the page.
    ///
    /// # Errors
    ///
    /// Returns the classified provider error when the listing call fails.
    pub async fn list_messages(
        &self,
        after: Option<DateTime<Utc>>,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>> {
        let query = Self::build_query(after);
        debug!("Listing messages, query: '{query}', max_results: {max_results}");

        let mut request = self
            .http
            .get(format!("{}/users/me/messages", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[
                ("maxResults", max_results.to_string()),
                ("labelIds", "INBOX".to_string()),
            ]);
        if !query.is_empty() {
            request = request.query(&[("q", query.as_str())]);
        }

        let response = Self::check(request.send().await?).await?;
        let listing: MessageListResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        debug!("Listing returned {} message IDs", listing.messages.len());

        let mut summaries = Vec::with_capacity(listing.messages.len());
        for msg in listing.messages {
            match self.get_message(&msg.id).await {
                Ok(detail) => summaries.push(detail.into_summary()),
                // Auth failures poison every subsequent call; stop here so
                // the caller can deactivate instead of logging 50 failures.
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    error!("Failed to fetch message {}: {e}", msg.id);
                }
            }
        }

        info!("Fetched {} messages", summaries.len());
        Ok(summaries)
    }

    /// Fetches the full detail of a single message.
    ///
    /// # Errors
    ///
    /// Returns the classified provider error when the fetch fails.
    pub async fn get_message(&self, message_id: &str) -> Result<MessageDetail> {
        let response = self
            .http
            .get(format!("{}/users/me/messages/{message_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        Ok(Self::detail_from_resource(resource))
    }

    /// Marks a message as read by removing the `UNREAD` label.
    ///
    /// # Errors
    ///
    /// Returns the classified provider error when the mutation fails.
    pub async fn mark_as_read(&self, message_id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!(
                "{}/users/me/messages/{message_id}/modify",
                self.base_url
            ))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        Self::check(response).await?;

        debug!("Marked message {message_id} as read");
        Ok(())
    }

    /// Lists the account's labels.
    ///
    /// # Errors
    ///
    /// Returns the classified provider error when the listing fails.
    pub async fn list_labels(&self) -> Result<Vec<Label>> {
        let response = self
            .http
            .get(format!("{}/users/me/labels", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let listing: LabelListResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        Ok(listing
            .labels
            .into_iter()
            .map(|l| Label {
                id: l.id,
                name: l.name,
            })
            .collect())
    }

    /// Builds the search query for a checkpoint.
    fn build_query(after: Option<DateTime<Utc>>) -> String {
        after.map_or_else(String::new, |dt| format!("after:{}", dt.timestamp()))
    }

    /// Classifies a non-success response into the three-way error split.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::from_status(status, &body))
    }

    fn detail_from_resource(resource: MessageResource) -> MessageDetail {
        let root = resource.payload.unwrap_or_default();

        let from_header = header_value(&root.headers, "From").unwrap_or_default();
        let (sender_email, sender_name) = payload::parse_mailbox(from_header);
        let subject = header_value(&root.headers, "Subject")
            .filter(|s| !s.is_empty())
            .unwrap_or("(No Subject)")
            .to_string();
        let received_at = payload::parse_date(header_value(&root.headers, "Date"));

        MessageDetail {
            message_id: resource.id,
            thread_id: resource.thread_id,
            sender_email,
            sender_name,
            subject,
            body_text: extract_body_text(&root),
            body_html: extract_body_html(&root),
            received_at,
            labels: resource.label_ids,
            snippet: resource.snippet,
            attachments: collect_attachments(&root),
        }
    }
}
