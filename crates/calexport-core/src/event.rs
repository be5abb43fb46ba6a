//! Event records flowing through an export run.
//!
//! A [`RawEvent`] is what a calendar source hands back for one occurrence.
//! Events that survive filtering are mapped into [`CalendarEntry`] values,
//! which only keep what the output file needs.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// An attendee's RSVP state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has not responded.
    NeedsAction,
    /// Not reported, or not something we recognise.
    #[default]
    Unknown,
}

impl ResponseStatus {
    /// Parses a provider status string. Anything unrecognised is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "accepted" => Self::Accepted,
            "tentative" => Self::Tentative,
            "declined" => Self::Declined,
            "needsAction" => Self::NeedsAction,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` for the statuses that count as attending.
    pub fn is_attending(self) -> bool {
        matches!(self, Self::Accepted | Self::Tentative)
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttendee {
    /// The attendee's email address. Empty when the source omitted it.
    pub email: String,
    /// The attendee's response status.
    #[serde(default)]
    pub response_status: ResponseStatus,
}

impl RawAttendee {
    /// Creates a new attendee with an `Unknown` response.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            response_status: ResponseStatus::Unknown,
        }
    }

    /// Builder method to set the response status.
    #[must_use]
    pub fn with_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }
}

/// One event occurrence as returned by a calendar source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Source identifier, used in logs and error messages.
    pub id: String,
    /// The event title.
    pub summary: Option<String>,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Attendees in source order.
    #[serde(default)]
    pub attendees: Vec<RawAttendee>,
    /// Whether attendees may see the guest list.
    #[serde(default = "default_guests_visible")]
    pub guests_can_see_other_guests: bool,
}

fn default_guests_visible() -> bool {
    true
}

impl RawEvent {
    /// Creates an event with no summary, no attendees and a visible guest list.
    pub fn new(id: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            id: id.into(),
            summary: None,
            start,
            end,
            attendees: Vec::new(),
            guests_can_see_other_guests: true,
        }
    }

    /// Builder method to set the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to add an attendee.
    #[must_use]
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to set guest list visibility.
    #[must_use]
    pub fn with_guests_visible(mut self, visible: bool) -> Self {
        self.guests_can_see_other_guests = visible;
        self
    }

    /// Looks up `email`'s response status, matching case-sensitively.
    ///
    /// Returns `Unknown` when the event has no attendees or `email` is not
    /// one of them.
    pub fn response_status_of(&self, email: &str) -> ResponseStatus {
        self.attendees
            .iter()
            .find(|a| a.email == email)
            .map_or(ResponseStatus::Unknown, |a| a.response_status)
    }
}

/// An entry of the exported calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    /// Entry title.
    pub name: String,
    /// Start bound, same shape as the source event.
    pub begin: EventTime,
    /// End bound, same shape as the source event.
    pub end: EventTime,
}
