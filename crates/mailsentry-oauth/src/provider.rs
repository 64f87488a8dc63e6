//! `OAuth2` provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Token revocation endpoint (if supported).
    pub revocation_url: Option<Url>,
    /// Userinfo endpoint for resolving the mailbox address (if supported).
    pub userinfo_url: Option<Url>,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            revocation_url: None,
            userinfo_url: None,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the token revocation URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_revocation_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.revocation_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the userinfo URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_userinfo_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.userinfo_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Google `OAuth2` provider configuration.
    ///
    /// Scopes cover read access to the mailbox, label modification
    /// (mark-as-read), and the userinfo email claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in URLs fail to parse.
    pub fn google() -> Result<Self> {
        Ok(Self::new(
            "Google",
            "https://accounts.google.com/o/oauth2/auth",
            "https://oauth2.googleapis.com/token",
        )?
        .with_revocation_url("https://oauth2.googleapis.com/revoke")?
        .with_userinfo_url("https://www.googleapis.com/oauth2/v2/userinfo")?
        .with_default_scopes(vec![
            "openid".to_string(),
            "https://www.googleapis.com/auth/gmail.readonly".to_string(),
            "https://www.googleapis.com/auth/gmail.modify".to_string(),
            "https://www.googleapis.com/auth/userinfo.email".to_string(),
        ]))
    }

    /// Validates the provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auth_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("auth_url is empty".into()));
        }
        if self.token_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("token_url is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_google_provider() {
        let provider = Provider::google().unwrap();
        assert_eq!(provider.name, "Google");
        assert!(provider.revocation_url.is_some());
        assert!(provider.userinfo_url.is_some());
        assert_eq!(provider.default_scopes.len(), 4);
        provider.validate().unwrap();
    }

    #[test]
    fn test_custom_provider() {
        let provider = Provider::new(
            "Custom",
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap()
        .with_default_scopes(vec!["email".to_string()]);

        assert_eq!(provider.name, "Custom");
        assert!(provider.revocation_url.is_none());
        assert_eq!(provider.default_scopes.len(), 1);
        provider.validate().unwrap();
    }
}
