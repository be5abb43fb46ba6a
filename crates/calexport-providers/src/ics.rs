//! iCalendar (RFC 5545) output.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use calexport_core::{CalendarEntry, EventTime};
use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, Property, ValueType};
use tracing::debug;

use crate::provider::CalendarWriter;

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Renders entries as one `VCALENDAR` with a `VEVENT` per entry, in order.
///
/// Date bounds are written as `VALUE=DATE`; date-times are written in UTC.
/// `DTSTAMP` is the given instant rather than the render time. `icalendar`
/// adds a random UUID v4 `UID` to each event.
pub fn render_calendar(entries: &[CalendarEntry], dtstamp: DateTime<Utc>) -> String {
    let mut cal = Calendar::new();

    for entry in entries {
        let mut event = icalendar::Event::new();
        event.timestamp(dtstamp);
        event.summary(&entry.name);
        add_time_property(&mut event, "DTSTART", &entry.begin);
        add_time_property(&mut event, "DTEND", &entry.end);
        cal.push(event.done());
    }

    cal.done().to_string()
}

fn add_time_property(event: &mut icalendar::Event, name: &str, time: &EventTime) {
    match time {
        EventTime::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            event.append_property(prop);
        }
        EventTime::DateTime(dt) => {
            event.add_property(name, dt.with_timezone(&Utc).format(UTC_FORMAT).to_string());
        }
    }
}

/// Writes `.ics` files, replacing the target only once the content is on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcsFileWriter;

impl IcsFileWriter {
    pub fn new() -> Self {
        Self
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

impl CalendarWriter for IcsFileWriter {
    fn write(&self, path: &Path, entries: &[CalendarEntry]) -> io::Result<()> {
        let content = render_calendar(entries, Utc::now());
        let temp_path = temp_sibling(path);

        if let Err(e) = fs::write(&temp_path, content).and_then(|()| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        debug!(path = %path.display(), entries = entries.len(), "wrote calendar");
        Ok(())
    }
}
