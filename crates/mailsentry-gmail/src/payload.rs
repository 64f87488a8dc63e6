//! Gmail message payload parsing.
//!
//! The API returns a message as a tree of parts mirroring the underlying
//! MIME structure. Extraction here is deliberately lenient: a part that
//! fails to decode degrades to nothing rather than failing the message.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::types::AttachmentInfo;

/// A full message resource as returned by `messages.get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResource {
    /// Message ID.
    pub id: String,
    /// Thread ID.
    #[serde(default)]
    pub thread_id: String,
    /// Label IDs.
    #[serde(default)]
    pub label_ids: Vec<String>,
    /// Short HTML-escaped preview.
    #[serde(default)]
    pub snippet: Option<String>,
    /// Payload tree.
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

/// One node of the payload tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// MIME type of this part.
    #[serde(default)]
    pub mime_type: String,
    /// Attachment filename, when the part is an attachment.
    #[serde(default)]
    pub filename: String,
    /// Part headers (only populated on the root and attachment parts).
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Part body.
    #[serde(default)]
    pub body: Option<PartBody>,
    /// Child parts for multipart containers.
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

/// A single message header.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Body of a payload part.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    /// Base64url-encoded content, absent for container parts.
    #[serde(default)]
    pub data: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// Looks up a header value by name, case-insensitively.
#[must_use]
pub fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Splits a From header into (address, optional display name).
///
/// `"Jane Doe" <jane@example.com>` yields `("jane@example.com", Some("Jane Doe"))`;
/// a bare address yields `(address, None)`.
#[must_use]
pub fn parse_mailbox(from_header: &str) -> (String, Option<String>) {
    let trimmed = from_header.trim();

    if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
        if open < close {
            let email = trimmed[open + 1..close].trim().to_string();
            let name = trimmed[..open].trim().trim_matches('"').trim();
            let name = if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            };
            if !email.is_empty() {
                return (email, name);
            }
        }
    }

    (trimmed.to_string(), None)
}

/// Parses a Date header, falling back to the current time.
#[must_use]
pub fn parse_date(date_header: Option<&str>) -> DateTime<Utc> {
    date_header
        .and_then(|raw| DateTime::parse_from_rfc2822(raw.trim()).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

/// Extracts the plain-text body from a payload tree.
///
/// Preference order: the part's own body data, then the first `text/plain`
/// child, then recursion into nested `multipart/*` containers. Returns an
/// empty string when nothing decodes.
#[must_use]
pub fn extract_body_text(payload: &MessagePart) -> String {
    let mut body_text = String::new();

    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        body_text = decode_part_data(data);
    }

    for part in &payload.parts {
        if part.mime_type == "text/plain" {
            if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
                let decoded = decode_part_data(data);
                if !decoded.is_empty() {
                    body_text = decoded;
                    break;
                }
            }
        }

        if part.mime_type.starts_with("multipart/") && !part.parts.is_empty() {
            let nested = extract_body_text(part);
            if !nested.is_empty() {
                body_text = nested;
                break;
            }
        }
    }

    body_text.trim().to_string()
}

/// Extracts the HTML body from a payload tree, when present.
#[must_use]
pub fn extract_body_html(payload: &MessagePart) -> Option<String> {
    for part in &payload.parts {
        if part.mime_type == "text/html" {
            if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
                let decoded = decode_part_data(data);
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        }

        if part.mime_type.starts_with("multipart/") && !part.parts.is_empty() {
            if let Some(html) = extract_body_html(part) {
                return Some(html);
            }
        }
    }

    None
}

/// Collects attachment metadata from parts that declare a filename.
#[must_use]
pub fn collect_attachments(payload: &MessagePart) -> Vec<AttachmentInfo> {
    payload
        .parts
        .iter()
        .filter(|part| !part.filename.is_empty())
        .map(|part| AttachmentInfo {
            filename: part.filename.clone(),
            mime_type: part.mime_type.clone(),
            size: part.body.as_ref().map_or(0, |b| b.size),
        })
        .collect()
}

/// Decodes base64url part data into text, degrading to empty on failure.
fn decode_part_data(data: &str) -> String {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned.trim_end_matches('=');

    match URL_SAFE_NO_PAD.decode(cleaned) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Failed to decode message part data: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    fn text_part(mime: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: mime.to_string(),
            body: Some(PartBody {
                data: Some(encode(text)),
                size: text.len() as u64,
            }),
            ..MessagePart::default()
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let headers = vec![
            Header {
                name: "From".to_string(),
                value: "a@example.com".to_string(),
            },
            Header {
                name: "SUBJECT".to_string(),
                value: "Hello".to_string(),
            },
        ];

        assert_eq!(header_value(&headers, "from"), Some("a@example.com"));
        assert_eq!(header_value(&headers, "Subject"), Some("Hello"));
        assert_eq!(header_value(&headers, "Date"), None);
    }

    #[test]
    fn parse_mailbox_with_display_name() {
        let (email, name) = parse_mailbox("\"Jane Doe\" <jane@example.com>");
        assert_eq!(email, "jane@example.com");
        assert_eq!(name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn parse_mailbox_bare_address() {
        let (email, name) = parse_mailbox("jane@example.com");
        assert_eq!(email, "jane@example.com");
        assert!(name.is_none());
    }

    #[test]
    fn parse_mailbox_unquoted_name() {
        let (email, name) = parse_mailbox("Support Team <help@shop.example>");
        assert_eq!(email, "help@shop.example");
        assert_eq!(name.as_deref(), Some("Support Team"));
    }

    #[test]
    fn parse_date_rfc2822() {
        let dt = parse_date(Some("Tue, 1 Jul 2025 10:52:37 +0200"));
        assert_eq!(dt.to_rfc3339(), "2025-07-01T08:52:37+00:00");
    }

    #[test]
    fn parse_date_garbage_falls_back_to_now() {
        let before = Utc::now();
        let dt = parse_date(Some("not a date"));
        assert!(dt >= before);
    }

    #[test]
    fn extract_direct_body() {
        let payload = text_part("text/plain", "direct body");
        assert_eq!(extract_body_text(&payload), "direct body");
    }

    #[test]
    fn extract_prefers_plain_text_part() {
        let payload = MessagePart {
            mime_type: "multipart/alternative".to_string(),
            parts: vec![
                text_part("text/html", "<p>html</p>"),
                text_part("text/plain", "plain wins"),
            ],
            ..MessagePart::default()
        };

        assert_eq!(extract_body_text(&payload), "plain wins");
    }

    #[test]
    fn extract_recurses_into_nested_multipart() {
        let inner = MessagePart {
            mime_type: "multipart/alternative".to_string(),
            parts: vec![text_part("text/plain", "nested text")],
            ..MessagePart::default()
        };
        let payload = MessagePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![inner],
            ..MessagePart::default()
        };

        assert_eq!(extract_body_text(&payload), "nested text");
    }

    #[test]
    fn extract_returns_empty_for_undecodable_data() {
        let payload = MessagePart {
            mime_type: "text/plain".to_string(),
            body: Some(PartBody {
                data: Some("!!not base64!!".to_string()),
                size: 0,
            }),
            ..MessagePart::default()
        };

        assert_eq!(extract_body_text(&payload), "");
    }

    #[test]
    fn extract_html_from_nested_tree() {
        let inner = MessagePart {
            mime_type: "multipart/alternative".to_string(),
            parts: vec![
                text_part("text/plain", "plain"),
                text_part("text/html", "<b>rich</b>"),
            ],
            ..MessagePart::default()
        };
        let payload = MessagePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![inner],
            ..MessagePart::default()
        };

        assert_eq!(extract_body_html(&payload).as_deref(), Some("<b>rich</b>"));
    }

    #[test]
    fn attachments_collected_from_named_parts() {
        let payload = MessagePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![
                text_part("text/plain", "body"),
                MessagePart {
                    mime_type: "application/pdf".to_string(),
                    filename: "invoice.pdf".to_string(),
                    body: Some(PartBody {
                        data: None,
                        size: 52_133,
                    }),
                    ..MessagePart::default()
                },
            ],
            ..MessagePart::default()
        };

        let attachments = collect_attachments(&payload);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "invoice.pdf");
        assert_eq!(attachments[0].mime_type, "application/pdf");
        assert_eq!(attachments[0].size, 52_133);
    }

    #[test]
    fn decode_tolerates_padding() {
        use base64::engine::general_purpose::URL_SAFE;
        let padded = URL_SAFE.encode(b"padded text");
        assert_eq!(decode_part_data(&padded), "padded text");
    }
}
