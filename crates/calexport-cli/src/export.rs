//! The export run: authenticate, fetch, filter, transcode, write.

use std::path::Path;

use calexport_core::{EventFilterPipeline, ExportConfig, TimeWindow, transcode_all};
use calexport_providers::{Authenticator, CalendarWriter, EventSource};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The source returned no events. Nothing was written.
    NothingFetched,
    /// Every fetched event was filtered out. Nothing was written.
    NothingAccepted { fetched: usize },
    /// The calendar file was written.
    Written { fetched: usize, written: usize },
}

/// One export run over injected collaborators.
pub struct Exporter<'a> {
    authenticator: &'a dyn Authenticator,
    source: &'a dyn EventSource,
    writer: &'a dyn CalendarWriter,
    config: &'a ExportConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(
        authenticator: &'a dyn Authenticator,
        source: &'a dyn EventSource,
        writer: &'a dyn CalendarWriter,
        config: &'a ExportConfig,
    ) -> Self {
        Self {
            authenticator,
            source,
            writer,
            config,
        }
    }

    /// Runs the export for the window around `now` and writes `output`.
    ///
    /// The output file is only touched when at least one event survives
    /// filtering; any error leaves it as it was.
    pub async fn run(&self, now: DateTime<Utc>, output: &Path) -> ClientResult<ExportOutcome> {
        let range = self.config.export_range;
        let window = TimeWindow::around(now, range.days_ago, range.days_ahead).ok_or_else(|| {
            ClientError::Config(format!(
                "export range of {} days back and {} days ahead is out of range",
                range.days_ago, range.days_ahead
            ))
        })?;

        let credential = self
            .authenticator
            .obtain_credential()
            .await
            .map_err(ClientError::Auth)?;

        debug!(start = %window.start, end = %window.end, "fetching events");
        let events = self
            .source
            .fetch(&credential, &window)
            .await
            .map_err(ClientError::from_fetch)?;

        let fetched = events.len();
        if fetched == 0 {
            info!("no events in range, nothing to export");
            return Ok(ExportOutcome::NothingFetched);
        }

        let user_email = self
            .authenticator
            .resolve_user_email(&credential)
            .await
            .map_err(ClientError::Auth)?;
        debug!(user_email = %user_email, "resolved current user");

        let accepted = EventFilterPipeline::new(self.config, &user_email).apply(events)?;
        let entries = transcode_all(&accepted)?;
        info!(fetched, accepted = entries.len(), "filtered events");

        if entries.is_empty() {
            info!("every event was filtered out, nothing to export");
            return Ok(ExportOutcome::NothingAccepted { fetched });
        }

        self.writer.write(output, &entries)?;
        info!(path = %output.display(), entries = entries.len(), "calendar written");

        Ok(ExportOutcome::Written {
            fetched,
            written: entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use calexport_core::{CalendarEntry, EventTime, RawAttendee, RawEvent, ResponseStatus};
    use calexport_providers::{BoxFuture, Credential, ProviderError, ProviderResult};
    use chrono::{Duration, FixedOffset, TimeZone};

    const ME: &str = "me@example.com";

    struct FakeAuth {
        fail: bool,
        email_calls: AtomicUsize,
    }

    impl FakeAuth {
        fn ok() -> Self {
            Self {
                fail: false,
                email_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                email_calls: AtomicUsize::new(0),
            }
        }
    }

    impl Authenticator for FakeAuth {
        fn obtain_credential(&self) -> BoxFuture<'_, ProviderResult<Credential>> {
            Box::pin(async move {
                if self.fail {
                    Err(ProviderError::authentication("sign-in cancelled"))
                } else {
                    Ok(Credential::new("token"))
                }
            })
        }

        fn resolve_user_email<'a>(
            &'a self,
            _credential: &'a Credential,
        ) -> BoxFuture<'a, ProviderResult<String>> {
            self.email_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(ME.to_string()) })
        }
    }

    struct FakeSource {
        result: Mutex<Option<ProviderResult<Vec<RawEvent>>>>,
        window: Mutex<Option<TimeWindow>>,
    }

    impl FakeSource {
        fn returning(result: ProviderResult<Vec<RawEvent>>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                window: Mutex::new(None),
            }
        }

        fn events(events: Vec<RawEvent>) -> Self {
            Self::returning(Ok(events))
        }
    }

    impl EventSource for FakeSource {
        fn fetch<'a>(
            &'a self,
            _credential: &'a Credential,
            window: &'a TimeWindow,
        ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
            *self.window.lock().unwrap() = Some(*window);
            let result = self.result.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()));
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        written: Mutex<Option<Vec<CalendarEntry>>>,
        fail: bool,
    }

    impl CalendarWriter for RecordingWriter {
        fn write(&self, _path: &Path, entries: &[CalendarEntry]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            *self.written.lock().unwrap() = Some(entries.to_vec());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, 8, 0, 0).unwrap()
    }

    fn meeting(id: &str, summary: &str, hour: u32) -> RawEvent {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let start = tz.with_ymd_and_hms(2025, 2, 5, hour, 0, 0).unwrap();
        RawEvent::new(
            id,
            EventTime::DateTime(start),
            EventTime::DateTime(start + Duration::minutes(30)),
        )
        .with_summary(summary)
    }

    fn config() -> ExportConfig {
        ExportConfig::default()
            .with_range(2, 14)
            .with_ignored("Lunch")
            .with_large_event_threshold(3)
    }

    fn names(writer: &RecordingWriter) -> Vec<String> {
        writer
            .written
            .lock()
            .unwrap()
            .as_ref()
            .map(|entries| entries.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    async fn run(
        auth: &FakeAuth,
        source: &FakeSource,
        writer: &RecordingWriter,
    ) -> ClientResult<ExportOutcome> {
        let config = config();
        Exporter::new(auth, source, writer, &config)
            .run(now(), Path::new("out.ics"))
            .await
    }

    #[tokio::test]
    async fn accepted_events_are_written_in_order() {
        let auth = FakeAuth::ok();
        let source = FakeSource::events(vec![
            meeting("1", "Standup", 9),
            meeting("2", "Lunch", 12),
            meeting("3", "Review", 15),
        ]);
        let writer = RecordingWriter::default();

        let outcome = run(&auth, &source, &writer).await.unwrap();

        assert_eq!(outcome, ExportOutcome::Written { fetched: 3, written: 2 });
        assert_eq!(names(&writer), vec!["Standup", "Review"]);
        assert_eq!(auth.email_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn window_comes_from_export_range() {
        let source = FakeSource::events(vec![]);
        run(&FakeAuth::ok(), &source, &RecordingWriter::default())
            .await
            .unwrap();

        let window = source.window.lock().unwrap().unwrap();
        assert_eq!(window.start, now() - Duration::days(2));
        assert_eq!(window.end, now() + Duration::days(14));
    }

    #[tokio::test]
    async fn empty_fetch_writes_nothing() {
        let auth = FakeAuth::ok();
        let writer = RecordingWriter::default();

        let outcome = run(&auth, &FakeSource::events(vec![]), &writer).await.unwrap();

        assert_eq!(outcome, ExportOutcome::NothingFetched);
        assert!(writer.written.lock().unwrap().is_none());
        assert_eq!(auth.email_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn everything_filtered_writes_nothing() {
        let writer = RecordingWriter::default();
        let outcome = run(
            &FakeAuth::ok(),
            &FakeSource::events(vec![meeting("1", "Lunch", 12)]),
            &writer,
        )
        .await
        .unwrap();

        assert_eq!(outcome, ExportOutcome::NothingAccepted { fetched: 1 });
        assert!(writer.written.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn large_event_needs_acceptance() {
        let mut declined = meeting("1", "All Hands", 16);
        let mut accepted = meeting("2", "Planning", 17);
        for (i, event) in [&mut declined, &mut accepted].into_iter().enumerate() {
            event.attendees = vec![
                RawAttendee::new("a@example.com"),
                RawAttendee::new("b@example.com"),
                RawAttendee::new(ME).with_status(if i == 0 {
                    ResponseStatus::Declined
                } else {
                    ResponseStatus::Accepted
                }),
            ];
        }
        let writer = RecordingWriter::default();

        run(&FakeAuth::ok(), &FakeSource::events(vec![declined, accepted]), &writer)
            .await
            .unwrap();

        assert_eq!(names(&writer), vec!["Planning"]);
    }

    #[tokio::test]
    async fn auth_failure_stops_before_fetch() {
        let source = FakeSource::events(vec![meeting("1", "Standup", 9)]);
        let writer = RecordingWriter::default();

        let err = run(&FakeAuth::failing(), &source, &writer).await.unwrap_err();

        assert!(matches!(err, ClientError::Auth(_)));
        assert!(source.window.lock().unwrap().is_none());
        assert!(writer.written.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let source = FakeSource::returning(Err(ProviderError::network("connection failed")));
        let err = run(&FakeAuth::ok(), &source, &RecordingWriter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Fetch(_)));
    }

    #[tokio::test]
    async fn source_record_without_bounds_aborts() {
        let source = FakeSource::returning(Err(ProviderError::missing_field("event x has no start")));
        let err = run(&FakeAuth::ok(), &source, &RecordingWriter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingField(_)));
    }

    #[tokio::test]
    async fn accepted_event_without_summary_aborts_the_run() {
        let mut untitled = meeting("2", "", 10);
        untitled.summary = None;
        let writer = RecordingWriter::default();

        let err = run(
            &FakeAuth::ok(),
            &FakeSource::events(vec![meeting("1", "Standup", 9), untitled]),
            &writer,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::MissingField(ref m) if m.contains("summary")));
        assert!(writer.written.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_event_without_summary_is_harmless() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let start = tz.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap();
        let trip = RawEvent::new(
            "trip",
            EventTime::DateTime(start),
            EventTime::DateTime(start + Duration::days(3)),
        );
        let writer = RecordingWriter::default();

        let outcome = run(
            &FakeAuth::ok(),
            &FakeSource::events(vec![trip, meeting("1", "Standup", 9)]),
            &writer,
        )
        .await
        .unwrap();

        assert_eq!(outcome, ExportOutcome::Written { fetched: 2, written: 1 });
    }

    #[tokio::test]
    async fn unrepresentable_window_is_config_error() {
        let auth = FakeAuth::ok();
        let source = FakeSource::events(vec![meeting("1", "Standup", 9)]);
        let writer = RecordingWriter::default();
        let config = ExportConfig::default().with_range(0, u32::MAX);

        let err = Exporter::new(&auth, &source, &writer, &config)
            .run(now(), Path::new("out.ics"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Config(_)));
        assert!(source.window.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn large_event_without_summary_aborts_the_run() {
        let mut untitled = meeting("2", "", 14);
        untitled.summary = None;
        untitled.attendees = (0..4)
            .map(|i| RawAttendee::new(format!("guest{i}@example.com")))
            .collect();
        let writer = RecordingWriter::default();

        let err = run(
            &FakeAuth::ok(),
            &FakeSource::events(vec![meeting("1", "Standup", 9), untitled]),
            &writer,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::MissingField(ref m) if m.contains("summary")));
        assert!(writer.written.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn write_failure_is_io_error() {
        let writer = RecordingWriter {
            fail: true,
            ..Default::default()
        };
        let err = run(
            &FakeAuth::ok(),
            &FakeSource::events(vec![meeting("1", "Standup", 9)]),
            &writer,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
