//! Google Calendar backend.
//!
//! Sign-in uses the OAuth 2.0 installed-app flow with PKCE and a loopback
//! redirect. Tokens are cached in a JSON file and refreshed when they
//! expire; a fresh browser sign-in happens only when nothing usable is
//! cached.
//!
//! ```ignore
//! use calexport_providers::google::{ClientSecrets, GoogleAuthenticator, GoogleConfig, GoogleEventSource};
//!
//! let config = GoogleConfig::new(ClientSecrets::File("credentials.json".into()));
//! let auth = GoogleAuthenticator::new(config.clone())?;
//! let source = GoogleEventSource::new(&config)?;
//! ```

mod auth;
mod client;
mod config;
mod oauth;
mod source;
mod tokens;

pub use auth::GoogleAuthenticator;
pub use client::GoogleApiClient;
pub use config::{ClientSecrets, DEFAULT_SCOPES, GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use source::GoogleEventSource;
pub use tokens::{CredentialState, TokenInfo, TokenStorage};
