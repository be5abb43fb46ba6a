//! Rules deciding which events make it into the export.
//!
//! Rules run in a fixed order and the first one that rejects wins:
//!
//! 1. events spanning a full day or more are dropped;
//! 2. events whose summary is on the ignore list are dropped;
//! 3. "large" events are dropped unless the user accepted or tentatively
//!    accepted them.
//!
//! An event is large when its guest list is hidden, or when it has at least
//! [`ExportConfig::large_event_threshold`] attendees.
//!
//! An event that passes the duration rule without a summary is an error.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::event::{RawEvent, ResponseStatus};
use crate::transcode::TranscodeError;

/// How far back and forward an export run looks, in days from now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRange {
    pub days_ago: u32,
    pub days_ahead: u32,
}

impl ExportRange {
    /// Largest accepted value for either side of the range (about a century).
    pub const MAX_DAYS: u32 = 36_600;

    /// Returns `true` if both sides are within [`ExportRange::MAX_DAYS`].
    pub fn is_within_limits(&self) -> bool {
        self.days_ago <= Self::MAX_DAYS && self.days_ahead <= Self::MAX_DAYS
    }
}

/// Settings shared by every rule of an export run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Fetch window.
    pub export_range: ExportRange,
    /// Summaries excluded unconditionally (exact match).
    pub ignore_events: BTreeSet<String>,
    /// Attendee count at which an event with a visible guest list is large.
    pub large_event_threshold: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_range: ExportRange::default(),
            ignore_events: BTreeSet::new(),
            large_event_threshold: 1,
        }
    }
}

impl ExportConfig {
    /// Builder method to set the fetch window.
    #[must_use]
    pub fn with_range(mut self, days_ago: u32, days_ahead: u32) -> Self {
        self.export_range = ExportRange {
            days_ago,
            days_ahead,
        };
        self
    }

    /// Builder method to add a summary to the ignore list.
    #[must_use]
    pub fn with_ignored(mut self, summary: impl Into<String>) -> Self {
        self.ignore_events.insert(summary.into());
        self
    }

    /// Builder method to set the large-event threshold.
    #[must_use]
    pub fn with_large_event_threshold(mut self, threshold: usize) -> Self {
        self.large_event_threshold = threshold;
        self
    }
}

/// Why an event was left out of the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The event spans 24 hours or more.
    MultiDay,
    /// The summary is on the ignore list.
    Ignored,
    /// The event is large and the user's response is not accepted/tentative.
    LargeNotAccepted(ResponseStatus),
}

/// Outcome of running the rules against one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    /// Returns `true` if the event is kept.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Returns `true` if the event lasts a full day or longer.
pub fn is_multi_day(event: &RawEvent) -> bool {
    event.start.span_until(&event.end) >= Duration::days(1)
}

/// Returns `true` if the event counts as large for the given threshold.
pub fn is_large(event: &RawEvent, threshold: usize) -> bool {
    !event.guests_can_see_other_guests || event.attendees.len() >= threshold
}

/// The export filter for one run: config plus the signed-in user's address.
#[derive(Debug, Clone, Copy)]
pub struct EventFilterPipeline<'a> {
    config: &'a ExportConfig,
    user_email: &'a str,
}

impl<'a> EventFilterPipeline<'a> {
    pub fn new(config: &'a ExportConfig, user_email: &'a str) -> Self {
        Self { config, user_email }
    }

    /// Runs every rule in order and reports the first rejection.
    ///
    /// # Errors
    ///
    /// An event that survives the duration rule must have a summary for
    /// the ignore list to be checked; without one the run cannot go on.
    pub fn evaluate(&self, event: &RawEvent) -> Result<FilterDecision, TranscodeError> {
        if is_multi_day(event) {
            return Ok(FilterDecision::Reject(RejectReason::MultiDay));
        }

        let summary = event
            .summary
            .as_ref()
            .ok_or_else(|| TranscodeError::MissingField {
                event_id: event.id.clone(),
                field: "summary",
            })?;
        if self.config.ignore_events.contains(summary) {
            return Ok(FilterDecision::Reject(RejectReason::Ignored));
        }

        if is_large(event, self.config.large_event_threshold) {
            let status = event.response_status_of(self.user_email);
            if !status.is_attending() {
                return Ok(FilterDecision::Reject(RejectReason::LargeNotAccepted(status)));
            }
        }

        Ok(FilterDecision::Accept)
    }

    /// Returns `true` if the event belongs in the export.
    pub fn accept(&self, event: &RawEvent) -> bool {
        matches!(self.evaluate(event), Ok(FilterDecision::Accept))
    }

    /// Keeps the accepted events, preserving their order.
    pub fn apply(&self, events: Vec<RawEvent>) -> Result<Vec<RawEvent>, TranscodeError> {
        let mut kept = Vec::with_capacity(events.len());
        for event in events {
            match self.evaluate(&event)? {
                FilterDecision::Accept => kept.push(event),
                FilterDecision::Reject(reason) => {
                    tracing::debug!(event_id = %event.id, summary = ?event.summary, ?reason, "event rejected");
                }
            }
        }
        Ok(kept)
    }
}
