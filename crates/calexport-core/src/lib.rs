//! Core types: event times, raw events, filter rules, transcoding

pub mod event;
pub mod filter;
pub mod time;
pub mod tracing;
pub mod transcode;

pub use event::{CalendarEntry, RawAttendee, RawEvent, ResponseStatus};
pub use filter::{EventFilterPipeline, ExportConfig, ExportRange, FilterDecision, RejectReason};
pub use time::{EventTime, TimeWindow};
pub use self::tracing::{init_tracing, TracingConfig, TracingError};
pub use transcode::{transcode, transcode_all, TranscodeError};
