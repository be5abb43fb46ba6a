//! Google account settings for an export run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Scopes requested at sign-in: identity, the user's address and read-only
/// calendar access.
pub const DEFAULT_SCOPES: &[&str] = &[
    "openid",
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// OAuth client registered in the Google Cloud Console.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// The client secrets JSON downloaded from the Cloud Console.
///
/// Either an `installed`/`web` section, or `client_id`/`client_secret` at
/// the top level.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecretsSection>,
    web: Option<ClientSecretsSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a client secrets file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from client secrets JSON.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration("failed to parse credentials JSON").with_source(e)
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }
        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "credentials file needs an 'installed' or 'web' section, or top-level 'client_id' and 'client_secret'",
            )),
        }
    }

    /// Checks the client id looks like a Google one and the secret is set.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Where the OAuth client credentials come from.
///
/// A file is only read when [`ClientSecrets::load`] is called, which the
/// authenticator does only to refresh a token or sign in.
#[derive(Debug, Clone)]
pub enum ClientSecrets {
    Inline(OAuthCredentials),
    File(PathBuf),
}

impl ClientSecrets {
    /// Returns validated credentials, reading the file if needed.
    pub fn load(&self) -> ProviderResult<OAuthCredentials> {
        let credentials = match self {
            Self::Inline(credentials) => credentials.clone(),
            Self::File(path) => OAuthCredentials::from_file(path)?,
        };
        credentials
            .validate()
            .map_err(|e| ProviderError::configuration(format!("invalid credentials: {e}")))?;
        Ok(credentials)
    }
}

impl From<OAuthCredentials> for ClientSecrets {
    fn from(credentials: OAuthCredentials) -> Self {
        Self::Inline(credentials)
    }
}

/// Everything the Google authenticator and event source need.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: ClientSecrets,

    /// Where the token cache lives.
    pub token_path: PathBuf,

    /// Calendar queried by the event source. Defaults to `primary`.
    pub calendar_id: String,

    /// Per-request timeout.
    pub timeout: Duration,

    pub user_agent: String,

    /// Ports tried, in order, for the sign-in redirect listener.
    pub loopback_port_range: (u16, u16),

    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub const DEFAULT_CALENDAR_ID: &'static str = "primary";

    pub fn new(credentials: impl Into<ClientSecrets>) -> Self {
        Self {
            credentials: credentials.into(),
            token_path: Self::default_token_path(),
            calendar_id: Self::DEFAULT_CALENDAR_ID.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calexport/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// `<data dir>/calexport/google-token.json`, or the working directory
    /// when no data dir is known.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("calexport"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("google-token.json")
    }

    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    #[must_use]
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Checks the settings. Inline credentials are checked here; a
    /// credentials file is checked when it is loaded.
    pub fn validate(&self) -> ProviderResult<()> {
        if let ClientSecrets::Inline(credentials) = &self.credentials {
            credentials
                .validate()
                .map_err(|e| ProviderError::configuration(format!("invalid credentials: {e}")))?;
        }

        if self.calendar_id.trim().is_empty() {
            return Err(ProviderError::configuration("calendar_id must not be empty"));
        }
        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "secret").validate().is_err());
        assert!(
            OAuthCredentials::new("test.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn defaults() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(
            config.scopes,
            vec![
                "openid",
                "https://www.googleapis.com/auth/calendar.readonly",
                "https://www.googleapis.com/auth/userinfo.email",
            ]
        );
        assert!(config.token_path.ends_with("calexport/google-token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_failures() {
        let config = GoogleConfig::new(test_credentials()).with_scopes(vec![]);
        assert!(config.validate().is_err());

        let config = GoogleConfig::new(test_credentials()).with_calendar_id(" ");
        assert!(config.validate().is_err());

        let config = GoogleConfig::new(test_credentials()).with_loopback_port_range(9010, 9000);
        assert!(config.validate().is_err());

        let err = GoogleConfig::new(OAuthCredentials::new("bad", "s"))
            .validate()
            .unwrap_err();
        assert!(err.message().starts_with("invalid credentials"));
    }

    #[test]
    fn builder_methods() {
        let config = GoogleConfig::new(test_credentials())
            .with_calendar_id("team@example.com")
            .with_token_path("/tmp/token.json")
            .with_timeout(Duration::from_secs(60))
            .with_loopback_port_range(9000, 9010);

        assert_eq!(config.calendar_id, "team@example.com");
        assert_eq!(config.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.loopback_port_range, (9000, 9010));
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{"web": {"client_id": "web-id.apps.googleusercontent.com", "client_secret": "web-secret"}}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{"client_id": "flat.apps.googleusercontent.com", "client_secret": "flat-secret"}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_secret, "flat-secret");
    }

    #[test]
    fn credentials_from_json_rejects_other_shapes() {
        let err = OAuthCredentials::from_json(r#"{"client_id": "only-id"}"#).unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::ConfigurationError);
        assert!(OAuthCredentials::from_json("not json").is_err());
    }

    #[test]
    fn file_secrets_are_read_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let config = GoogleConfig::new(ClientSecrets::File(path.clone()));
        // Nothing on disk yet, and validation does not look.
        assert!(config.validate().is_ok());
        assert!(config.credentials.load().is_err());

        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "later.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.credentials.load().unwrap().client_id,
            "later.apps.googleusercontent.com"
        );
    }

    #[test]
    fn loaded_file_secrets_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"client_id": "not-google", "client_secret": "s"}"#).unwrap();
        let err = ClientSecrets::File(path).load().unwrap_err();
        assert!(err.message().starts_with("invalid credentials"));
    }

    #[test]
    fn credentials_from_missing_file() {
        let err = OAuthCredentials::from_file("/nonexistent/credentials.json").unwrap_err();
        assert!(err.message().contains("/nonexistent/credentials.json"));
    }
}
