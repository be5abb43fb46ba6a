//! Mapping accepted events into calendar entries.

use thiserror::Error;

use crate::event::{CalendarEntry, RawEvent};

/// Errors raised while converting an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    /// A field every exported event must carry is absent.
    #[error("event {event_id} is missing required field '{field}'")]
    MissingField {
        event_id: String,
        field: &'static str,
    },
}

/// Converts one accepted event into a calendar entry.
///
/// The summary becomes the entry name verbatim and both bounds are copied
/// unchanged, so all-day events stay all-day and offsets are kept.
pub fn transcode(event: &RawEvent) -> Result<CalendarEntry, TranscodeError> {
    let name = event
        .summary
        .clone()
        .ok_or_else(|| TranscodeError::MissingField {
            event_id: event.id.clone(),
            field: "summary",
        })?;

    Ok(CalendarEntry {
        name,
        begin: event.start,
        end: event.end,
    })
}

/// Converts every event, stopping at the first failure.
pub fn transcode_all(events: &[RawEvent]) -> Result<Vec<CalendarEntry>, TranscodeError> {
    events.iter().map(transcode).collect()
}
