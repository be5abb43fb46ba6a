//! Client error types.

use calexport_core::TranscodeError;
use calexport_providers::{ProviderError, ProviderErrorCode};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Everything that can abort an export run.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No credential could be obtained, or the user could not be identified.
    #[error("authentication failed: {0}")]
    Auth(#[source] ProviderError),

    /// The event source failed.
    #[error("failed to fetch events: {0}")]
    Fetch(#[source] ProviderError),

    /// An event lacks a mandatory field.
    #[error("missing field: {0}")]
    MissingField(String),

    /// The calendar file could not be written.
    #[error("failed to write calendar: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Classifies an event source failure. Records the source could not
    /// convert for lack of a start or end are reported as missing fields.
    pub fn from_fetch(err: ProviderError) -> Self {
        if err.code() == ProviderErrorCode::MissingField {
            Self::MissingField(err.message().to_string())
        } else {
            Self::Fetch(err)
        }
    }
}

impl From<TranscodeError> for ClientError {
    fn from(err: TranscodeError) -> Self {
        Self::MissingField(err.to_string())
    }
}
