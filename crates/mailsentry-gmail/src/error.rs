//! Error types for Gmail API operations.

use reqwest::StatusCode;

/// Result type alias for Gmail API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Gmail API error types.
///
/// The pipeline routes on three classes: [`Error::Auth`] is terminal for the
/// calling task and deactivates the account, [`Error::RateLimit`] and
/// [`Error::Temporary`] are retryable, everything else is surfaced to the
/// caller without further attempts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// OAuth token expired, revoked, or lacking required scopes.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// API quota exceeded; retry after backing off.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Transient server-side failure; retry after backing off.
    #[error("Temporary provider error: {0}")]
    Temporary(String),

    /// Non-retryable provider error.
    #[error("Provider error (status {status}): {message}")]
    Provider {
        /// HTTP status returned by the API.
        status: u16,
        /// Error detail from the response body.
        message: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Whether the error is worth retrying with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit(_) | Self::Temporary(_))
    }

    /// Whether the error indicates dead credentials.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Classifies a non-success API response into an error.
    ///
    /// 401 is always an auth failure. 403 is an auth failure only when the
    /// body names a configuration/permission problem; other 403s are
    /// terminal client errors. 429 is rate limiting, 5xx is temporary.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Auth("OAuth token expired or revoked".to_string()),
            StatusCode::FORBIDDEN => {
                if body.contains("accessNotConfigured") {
                    Self::Auth("Gmail API not enabled for this project".to_string())
                } else if body.contains("insufficientPermissions") {
                    Self::Auth("Insufficient OAuth permissions".to_string())
                } else {
                    Self::Provider {
                        status: status.as_u16(),
                        message: truncate(body),
                    }
                }
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Self::RateLimit("Gmail API rate limit exceeded".to_string())
            }
            s if s.is_server_error() => Self::Temporary(format!(
                "Gmail API server error (status {}): {}",
                s.as_u16(),
                truncate(body)
            )),
            s => Self::Provider {
                status: s.as_u16(),
                message: truncate(body),
            },
        }
    }
}

/// Bound error detail to something log-friendly.
fn truncate(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_auth() {
        let err = Error::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_auth());
        assert!(!err.is_retryable());
    }

    #[test]
    fn forbidden_with_access_not_configured_is_auth() {
        let err = Error::from_status(
            StatusCode::FORBIDDEN,
            r#"{"error": {"errors": [{"reason": "accessNotConfigured"}]}}"#,
        );
        assert!(err.is_auth());
    }

    #[test]
    fn forbidden_with_insufficient_permissions_is_auth() {
        let err = Error::from_status(
            StatusCode::FORBIDDEN,
            r#"{"error": {"errors": [{"reason": "insufficientPermissions"}]}}"#,
        );
        assert!(err.is_auth());
    }

    #[test]
    fn plain_forbidden_is_client_error() {
        let err = Error::from_status(StatusCode::FORBIDDEN, "domain policy");
        assert!(!err.is_auth());
        assert!(!err.is_retryable());
        assert!(matches!(err, Error::Provider { status: 403, .. }));
    }

    #[test]
    fn rate_limit_is_retryable() {
        let err = Error::from_status(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(err.is_retryable());
        assert!(!err.is_auth());
    }

    #[test]
    fn server_errors_are_retryable() {
        for code in [500u16, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = Error::from_status(status, "upstream hiccup");
            assert!(err.is_retryable(), "status {code} should be retryable");
        }
    }

    #[test]
    fn not_found_is_client_error() {
        let err = Error::from_status(StatusCode::NOT_FOUND, "no such message");
        assert!(!err.is_retryable());
        assert!(matches!(err, Error::Provider { status: 404, .. }));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = Error::from_status(StatusCode::NOT_FOUND, &body);
        let Error::Provider { message, .. } = err else {
            panic!("expected provider error");
        };
        assert!(message.len() < 400);
        assert!(message.ends_with("..."));
    }
}
