//! Client configuration.
//!
//! Settings live in one TOML file, `$CALEXPORT_CONFIG` if set, otherwise
//! `config.toml` in the working directory:
//!
//! ```toml
//! ignore_events = ["Lunch", "Focus time"]
//! large_event_size = 5
//!
//! [export_range]
//! days_ago = 7
//! days = 30
//!
//! [google]
//! client_id = "env::GOOGLE_CLIENT_ID"
//! client_secret = "pass::google/calexport"
//! ```
//!
//! Without `client_id`/`client_secret`, OAuth client credentials are read
//! from `credentials_file` (default `credentials.json`), and only when a
//! token has to be refreshed or obtained.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use calexport_core::{ExportConfig, ExportRange};
use calexport_providers::google::{ClientSecrets, GoogleConfig, OAuthCredentials};
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CALEXPORT_CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Configuration for the calexport client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub export_range: ExportRangeSettings,

    /// Summaries never exported.
    pub ignore_events: Vec<String>,

    /// Attendee count from which an event counts as large.
    pub large_event_size: usize,

    /// Verbose logging.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub google: GoogleSettings,
}

/// The `[export_range]` table.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ExportRangeSettings {
    pub days_ago: u32,
    /// Days after now.
    pub days: u32,
}

impl ClientConfig {
    /// Loads the config from [`config_path`].
    pub fn load() -> ClientResult<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates a config document.
    pub fn from_toml(content: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ClientResult<()> {
        if self.large_event_size == 0 {
            return Err(ClientError::Config(
                "large_event_size must be at least 1".to_string(),
            ));
        }
        if !self.export_range().is_within_limits() {
            return Err(ClientError::Config(format!(
                "export_range.days_ago and export_range.days must not exceed {}",
                ExportRange::MAX_DAYS
            )));
        }
        Ok(())
    }

    fn export_range(&self) -> ExportRange {
        ExportRange {
            days_ago: self.export_range.days_ago,
            days_ahead: self.export_range.days,
        }
    }

    /// The filter settings for this run.
    pub fn to_export_config(&self) -> ExportConfig {
        ExportConfig {
            export_range: self.export_range(),
            ignore_events: self.ignore_events.iter().cloned().collect(),
            large_event_threshold: self.large_event_size,
        }
    }
}

/// Where the config is read from.
pub fn config_path() -> PathBuf {
    config_path_from(std::env::var_os(CONFIG_ENV))
}

fn config_path_from(var: Option<OsString>) -> PathBuf {
    var.filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// The optional `[google]` table.
///
/// `client_id` and `client_secret` accept secret references (`pass::…`,
/// `env::…`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleSettings {
    pub client_id: Option<String>,

    pub client_secret: Option<String>,

    /// Client secrets JSON from the Cloud Console.
    pub credentials_file: Option<PathBuf>,

    pub calendar_id: Option<String>,

    /// Token cache location.
    pub token_path: Option<PathBuf>,

    /// Per-request HTTP timeout.
    pub timeout_secs: Option<u64>,
}

impl GoogleSettings {
    /// Builds the provider configuration. Inline credentials are resolved
    /// here; a credentials file is left for the authenticator to read.
    pub fn to_provider_config(&self) -> ClientResult<GoogleConfig> {
        let credentials = self.resolve_credentials()?;
        let mut config = GoogleConfig::new(credentials);

        if let Some(ref id) = self.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config
            .validate()
            .map_err(|e| ClientError::Config(e.message().to_string()))?;
        Ok(config)
    }

    /// Inline credentials win; otherwise the credentials file is named.
    pub(crate) fn resolve_credentials(&self) -> ClientResult<ClientSecrets> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => {
                let id = crate::secret::resolve(id).map_err(|e| {
                    ClientError::Config(format!("failed to resolve client_id: {}", e))
                })?;
                let secret = crate::secret::resolve(secret).map_err(|e| {
                    ClientError::Config(format!("failed to resolve client_secret: {}", e))
                })?;
                Ok(OAuthCredentials::new(id, secret).into())
            }
            (Some(_), None) => Err(ClientError::Config(
                "client_secret is missing from the [google] section".to_string(),
            )),
            (None, Some(_)) => Err(ClientError::Config(
                "client_id is missing from the [google] section".to_string(),
            )),
            (None, None) => Ok(ClientSecrets::File(
                self.credentials_file
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE)),
            )),
        }
    }
}
