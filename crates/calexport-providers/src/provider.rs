//! Capabilities an export run is assembled from.
//!
//! The driver only talks to these traits:
//!
//! - [`Authenticator`] produces a [`Credential`] and names the signed-in user
//! - [`EventSource`] returns the raw events of a time window
//! - [`CalendarWriter`] persists the resulting entries

use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;

use calexport_core::{CalendarEntry, RawEvent, TimeWindow};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object safe, so the driver can take
/// `&dyn Authenticator` and friends.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A bearer credential for calendar and identity API calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    /// The raw bearer token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[redacted]")
            .finish()
    }
}

/// Obtains credentials and identifies the user they belong to.
pub trait Authenticator: Send + Sync {
    /// Returns a credential ready for use, refreshing or re-authorizing as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an authentication error when no valid credential can be
    /// produced.
    fn obtain_credential(&self) -> BoxFuture<'_, ProviderResult<Credential>>;

    /// Returns the email address of the credential's owner.
    fn resolve_user_email<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, ProviderResult<String>>;
}

/// Lists events from a calendar backend.
pub trait EventSource: Send + Sync {
    /// Returns the events overlapping `window`, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures,
    /// or records lacking a start/end.
    fn fetch<'a>(
        &'a self,
        credential: &'a Credential,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>>;
}

/// Persists calendar entries to a file.
pub trait CalendarWriter {
    /// Writes `entries` to `path`, replacing any existing file.
    fn write(&self, path: &Path, entries: &[CalendarEntry]) -> io::Result<()>;
}
