//! Cached OAuth tokens and the decision of what to do with them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set as persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,

    pub refresh_token: Option<String>,

    /// When the access token stops being usable. `None` means no known expiry.
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes granted at sign-in.
    pub scopes: Vec<String>,

    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(now: DateTime<Utc>, expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| now + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Builds a token set from a token endpoint response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(now, expires_in_secs),
            scopes,
            last_refresh: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Applies a refresh response. The refresh token and scopes are kept.
    pub fn update_access_token(&mut self, access_token: impl Into<String>, expires_in_secs: Option<i64>) {
        let now = Utc::now();
        self.access_token = access_token.into();
        self.expires_at = expiry_from(now, expires_in_secs);
        self.last_refresh = now;
    }
}

/// What the cached tokens allow us to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// The cached access token can be used as is.
    Valid(TokenInfo),
    /// The access token expired but a refresh token is available.
    Refreshable(TokenInfo),
    /// Nothing usable is cached; the user has to sign in again.
    InteractiveRequired,
}

impl CredentialState {
    /// Classifies a cache entry against the scopes this run needs.
    ///
    /// Tokens missing a required scope are discarded, since refreshing keeps
    /// the original grant.
    pub fn classify(tokens: Option<TokenInfo>, required_scopes: &[String], now: DateTime<Utc>) -> Self {
        match tokens {
            None => Self::InteractiveRequired,
            Some(tokens) if !tokens.has_scopes(required_scopes) => {
                debug!("cached token lacks required scopes");
                Self::InteractiveRequired
            }
            Some(tokens) if !tokens.is_expired_at(now) => Self::Valid(tokens),
            Some(tokens) if tokens.refresh_token.is_some() => Self::Refreshable(tokens),
            Some(_) => Self::InteractiveRequired,
        }
    }
}

/// JSON token cache on disk.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache. A missing file is `Ok(None)`.
    pub fn load(&self) -> ProviderResult<Option<TokenInfo>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token cache");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::io(format!("failed to read token file {}", self.path.display()))
                .with_source(e)
        })?;
        let tokens = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}",
                self.path.display()
            ))
            .with_source(e)
        })?;

        debug!(path = %self.path.display(), "loaded token cache");
        Ok(Some(tokens))
    }

    /// Writes the cache through a temp file and a rename, owner-only on Unix.
    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::io(format!("failed to create {}", parent.display())).with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal("failed to serialize tokens").with_source(e))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::io(format!("failed to write {}", temp_path.display())).with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::io(format!("failed to replace {}", self.path.display())).with_source(e)
        })?;

        debug!(path = %self.path.display(), "saved token cache");
        Ok(())
    }
}
