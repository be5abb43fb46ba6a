//! Google implementation of [`EventSource`].

use calexport_core::{RawEvent, TimeWindow};

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, Credential, EventSource};

use super::client::GoogleApiClient;
use super::config::GoogleConfig;

/// Reads events from one Google calendar.
#[derive(Debug, Clone)]
pub struct GoogleEventSource {
    api: GoogleApiClient,
    calendar_id: String,
}

impl GoogleEventSource {
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        Ok(Self {
            api: GoogleApiClient::new(config.timeout, &config.user_agent)?,
            calendar_id: config.calendar_id.clone(),
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }
}

impl EventSource for GoogleEventSource {
    fn fetch<'a>(
        &'a self,
        credential: &'a Credential,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            self.api
                .list_events(credential.access_token(), &self.calendar_id, window)
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }
}
