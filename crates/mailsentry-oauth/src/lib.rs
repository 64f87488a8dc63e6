//! # mailsentry-oauth
//!
//! `OAuth2` client library for connecting mailbox providers.
//!
//! ## Features
//!
//! - **Authorization Code Flow** for server-side web applications
//! - **Token management**: exchange, refresh, revocation, expiration checking
//! - **Provider configurations**: pre-configured for Google, custom endpoints supported
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsentry_oauth::{AuthorizationCodeFlow, OAuthClient, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::google()?;
//!     let client = OAuthClient::new("your_client_id", provider)
//!         .with_client_secret("your_secret")
//!         .with_redirect_uri("https://app.example.com/oauth/callback");
//!
//!     let flow = AuthorizationCodeFlow::new(client);
//!
//!     // Redirect the user here; `state` is the caller's CSRF token.
//!     let auth_url = flow.authorization_url(None, Some("csrf_state"))?;
//!
//!     // After the provider redirects back with a code:
//!     let token = flow.exchange_code("authorization_code", None).await?;
//!     println!("Access token: {}", token.access_token);
//!     Ok(())
//! }
//! ```
//!
//! ### Token Refresh
//!
//! ```ignore
//! if token.is_expired() {
//!     let new_token = client.refresh_token(&token).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, OAuthClient};
pub use provider::Provider;
pub use token::Token;
