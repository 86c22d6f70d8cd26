//! The `report` command.

use std::io::Write;

use calstats_core::{
    Aggregate, Classifier, DEFAULT_HIRING_MARKER, IgnorePatterns, ReportWriter, SlotAggregator,
    SlotPlan, WindowLength, generate_slots,
};
use calstats_providers::CalendarSource;
use chrono::NaiveDate;
use tracing::info;

use crate::cli::ReportArgs;
use crate::config::ReportSettings;
use crate::error::{CliError, CliResult};

/// Hour of day the first work day starts at when no start is given.
const DEFAULT_START_HOUR: &str = "07:00:00";

/// Fully resolved report parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub calendars: Vec<String>,
    /// Civil start time, `YYYY/MM/DD HH:MM:SS`.
    pub start: String,
    pub length: WindowLength,
    pub hiring_marker: String,
    /// Write the per-slot breakdown.
    pub verbose: bool,
}

impl ReportOptions {
    /// Merges command-line arguments over config file settings.
    ///
    /// `today` supplies the default start date.
    pub fn resolve(
        args: &ReportArgs,
        settings: &ReportSettings,
        verbose: bool,
        today: NaiveDate,
    ) -> CliResult<Self> {
        let length = match (args.days, args.duration) {
            (Some(days), _) => WindowLength::BusinessDays(days),
            (None, Some(hours)) => WindowLength::Hours(hours),
            (None, None) => match (settings.days, settings.duration_hours) {
                (Some(_), Some(_)) => {
                    return Err(CliError::Config(
                        "[report] sets both 'days' and 'duration_hours'; pick one".to_string(),
                    ));
                }
                (Some(days), None) => WindowLength::BusinessDays(days),
                (None, Some(hours)) => WindowLength::Hours(hours),
                (None, None) => WindowLength::default(),
            },
        };

        let start = args
            .start
            .clone()
            .or_else(|| settings.start.clone())
            .unwrap_or_else(|| format!("{} {}", today.format("%Y/%m/%d"), DEFAULT_START_HOUR));

        let hiring_marker = args
            .hiring_marker
            .clone()
            .or_else(|| settings.hiring_marker.clone())
            .unwrap_or_else(|| DEFAULT_HIRING_MARKER.to_string());

        Ok(Self {
            calendars: args.calendars.clone(),
            start,
            length,
            hiring_marker,
            verbose,
        })
    }
}

/// Writes the CSV report for every calendar to `out`.
///
/// Calendars are processed in order and each row is flushed as soon as it is
/// complete, so rows for earlier calendars survive a failure on a later one.
/// With `options.verbose` the per-slot breakdown goes to `detail`.
pub async fn run<W: Write, D: Write>(
    source: &dyn CalendarSource,
    patterns: &IgnorePatterns,
    options: &ReportOptions,
    out: W,
    mut detail: D,
) -> CliResult<()> {
    let mut report = ReportWriter::new(out);
    report.write_header()?;

    for id in &options.calendars {
        let calendar = source.calendar(id).await?;
        let timezone = calendar.timezone.as_deref().ok_or_else(|| {
            CliError::Timezone(format!("calendar '{}' does not report a timezone", id))
        })?;

        let plan = generate_slots(timezone, &options.start, options.length)?;
        let events = source.list_events(id, &plan.window).await?;
        info!(
            calendar = %id,
            summary = %calendar.summary,
            source = source.name(),
            timezone,
            slots = plan.slots.len(),
            events = events.len(),
            "analyzing calendar"
        );

        let classifier = Classifier::new(id, patterns, &options.hiring_marker);
        let aggregate = SlotAggregator::new(classifier).aggregate(&plan.slots, &events)?;

        if options.verbose {
            write_breakdown(&mut detail, id, &plan, &aggregate)?;
        }
        report.write_row(&aggregate.totals.summary(id.as_str(), timezone))?;
    }

    Ok(())
}

fn write_breakdown<D: Write>(
    detail: &mut D,
    id: &str,
    plan: &SlotPlan,
    aggregate: &Aggregate,
) -> std::io::Result<()> {
    writeln!(detail, "{} ({})", id, plan.timezone)?;
    for slot in &aggregate.slots {
        writeln!(detail, "{}", slot.label)?;
        for m in &slot.matches {
            writeln!(
                detail,
                "\t{} ({}, {}->{})",
                m.title,
                m.category,
                m.start.with_timezone(&plan.timezone).format("%H:%M:%S"),
                m.end.with_timezone(&plan.timezone).format("%H:%M:%S"),
            )?;
        }
    }
    detail.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calstats_core::{Attendee, Event, EventTime, ResponseStatus};
    use calstats_providers::{CalendarInfo, MemorySource};

    const ME: &str = "me@x.com";

    fn args(calendars: &[&str]) -> ReportArgs {
        ReportArgs {
            ignorelist: None,
            start: None,
            duration: None,
            days: None,
            hiring_marker: None,
            events_file: None,
            calendars: calendars.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
    }

    mod options {
        use super::*;

        #[test]
        fn defaults() {
            let options =
                ReportOptions::resolve(&args(&[ME]), &ReportSettings::default(), false, today())
                    .unwrap();
            assert_eq!(options.start, "2025/02/03 07:00:00");
            assert_eq!(options.length, WindowLength::Hours(168));
            assert_eq!(options.hiring_marker, DEFAULT_HIRING_MARKER);
            assert_eq!(options.calendars, vec![ME]);
        }

        #[test]
        fn flags_override_settings() {
            let settings = ReportSettings {
                start: Some("2025/01/06 08:00:00".to_string()),
                days: Some(3),
                hiring_marker: Some("from-config".to_string()),
                ..Default::default()
            };
            let mut cli = args(&[ME]);
            cli.duration = Some(40);
            cli.hiring_marker = Some("from-flag".to_string());

            let options = ReportOptions::resolve(&cli, &settings, true, today()).unwrap();
            assert_eq!(options.start, "2025/01/06 08:00:00");
            assert_eq!(options.length, WindowLength::Hours(40));
            assert_eq!(options.hiring_marker, "from-flag");
            assert!(options.verbose);
        }

        #[test]
        fn settings_length() {
            let settings = ReportSettings {
                duration_hours: Some(48),
                ..Default::default()
            };
            let options = ReportOptions::resolve(&args(&[ME]), &settings, false, today()).unwrap();
            assert_eq!(options.length, WindowLength::Hours(48));

            let settings = ReportSettings {
                days: Some(5),
                ..Default::default()
            };
            let options = ReportOptions::resolve(&args(&[ME]), &settings, false, today()).unwrap();
            assert_eq!(options.length, WindowLength::BusinessDays(5));
        }

        #[test]
        fn conflicting_settings_length() {
            let settings = ReportSettings {
                duration_hours: Some(48),
                days: Some(5),
                ..Default::default()
            };
            let err = ReportOptions::resolve(&args(&[ME]), &settings, false, today()).unwrap_err();
            assert!(matches!(err, CliError::Config(_)));

            // A flag on the command line settles it.
            let mut cli = args(&[ME]);
            cli.days = Some(2);
            let options = ReportOptions::resolve(&cli, &settings, false, today()).unwrap();
            assert_eq!(options.length, WindowLength::BusinessDays(2));
        }
    }

    mod pipeline {
        use super::*;

        fn timed(id: &str, title: &str, start: &str, end: &str) -> Event {
            Event::new(id, title, EventTime::timed(start), EventTime::timed(end))
        }

        fn my_week() -> Vec<Event> {
            vec![
                timed("1", "Interview", "2025-02-03T13:00:00Z", "2025-02-03T14:00:00Z")
                    .with_description("Feedback: https://hire.lever.co/interviews/123"),
                timed("2", "1:1 with Bob", "2025-02-04T10:00:00Z", "2025-02-04T10:30:00Z"),
                Event::new(
                    "3",
                    "Offsite",
                    EventTime::all_day("2025-02-04"),
                    EventTime::all_day("2025-02-05"),
                ),
                timed("4", "Sync", "2025-02-05T09:00:00Z", "2025-02-05T09:30:00Z")
                    .with_attendee(Attendee::new(ME).with_response(ResponseStatus::Accepted))
                    .with_attendee(Attendee::new("bob@x.com")),
                timed("5", "Review", "2025-02-06T09:00:00Z", "2025-02-06T10:00:00Z")
                    .with_attendee(Attendee::new(ME).with_response(ResponseStatus::NeedsAction)),
                timed("6", "Focus time", "2025-02-06T14:00:00Z", "2025-02-06T16:00:00Z")
                    .with_creator(ME, true),
                timed("7", "All hands", "2025-02-07T15:00:00Z", "2025-02-07T16:00:00Z")
                    .with_attendee(Attendee::new(ME).with_response(ResponseStatus::Declined)),
            ]
        }

        fn source() -> MemorySource {
            MemorySource::new()
                .with_calendar(
                    CalendarInfo::new(ME).with_timezone("Europe/London"),
                    my_week(),
                )
                .with_calendar(
                    CalendarInfo::new("you@x.com").with_timezone("America/New_York"),
                    vec![],
                )
        }

        fn options(calendars: &[&str], verbose: bool) -> ReportOptions {
            ReportOptions {
                calendars: calendars.iter().map(|c| c.to_string()).collect(),
                start: "2025/02/03 07:00:00".to_string(),
                length: WindowLength::Hours(168),
                hiring_marker: DEFAULT_HIRING_MARKER.to_string(),
                verbose,
            }
        }

        fn patterns() -> IgnorePatterns {
            IgnorePatterns::new(["1:1.*"]).unwrap()
        }

        async fn report(calendars: &[&str]) -> (CliResult<()>, String) {
            let mut out = Vec::new();
            let result = run(
                &source(),
                &patterns(),
                &options(calendars, false),
                &mut out,
                std::io::sink(),
            )
            .await;
            (result, String::from_utf8(out).unwrap())
        }

        #[tokio::test]
        async fn one_row_per_calendar() {
            let (result, csv) = report(&[ME, "you@x.com"]).await;
            result.unwrap();
            insta::assert_snapshot!(csv.trim_end(), @r"
            email,tz,free slots,personal,ignored,declined,not accepted,hiring,meeting,meeting hours,% meetings
            me@x.com,Europe/London,8,2.0,0.5,1.0,1.0,1.0,0.5,1.5,3%
            you@x.com,America/New_York,10,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0%
            ");
        }

        #[tokio::test]
        async fn earlier_rows_survive_a_failure() {
            let (result, csv) = report(&[ME, "nobody@x.com", "you@x.com"]).await;
            assert!(matches!(result.unwrap_err(), CliError::DataSource(_)));
            insta::assert_snapshot!(csv.trim_end(), @r"
            email,tz,free slots,personal,ignored,declined,not accepted,hiring,meeting,meeting hours,% meetings
            me@x.com,Europe/London,8,2.0,0.5,1.0,1.0,1.0,0.5,1.5,3%
            ");
        }

        #[tokio::test]
        async fn malformed_event_aborts() {
            let source = MemorySource::new().with_calendar(
                CalendarInfo::new(ME).with_timezone("Europe/London"),
                vec![timed("bad", "Broken", "2025-02-04T10:00:00Z", "not a time")],
            );
            let err = run(
                &source,
                &patterns(),
                &options(&[ME], false),
                std::io::sink(),
                std::io::sink(),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, CliError::TimeParse(_)));
        }

        #[tokio::test]
        async fn oversized_window_is_a_config_error() {
            let mut options = options(&[ME], false);
            options.length = WindowLength::Hours(u32::MAX);
            let err = run(
                &source(),
                &patterns(),
                &options,
                std::io::sink(),
                std::io::sink(),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, CliError::Config(_)));
        }

        #[tokio::test]
        async fn calendar_without_timezone() {
            let source = MemorySource::new().with_calendar(CalendarInfo::new(ME), vec![]);
            let err = run(
                &source,
                &patterns(),
                &options(&[ME], false),
                std::io::sink(),
                std::io::sink(),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, CliError::Timezone(_)));
        }

        #[tokio::test]
        async fn verbose_breakdown() {
            let mut detail = Vec::new();
            run(
                &source(),
                &patterns(),
                &options(&[ME], true),
                std::io::sink(),
                &mut detail,
            )
            .await
            .unwrap();

            let detail = String::from_utf8(detail).unwrap();
            let lines: Vec<&str> = detail.lines().collect();
            assert_eq!(
                lines,
                vec![
                    "me@x.com (Europe/London)",
                    "Mon Feb 3 Morning",
                    "Mon Feb 3 Afternoon",
                    "\tInterview (hiring, 13:00:00->14:00:00)",
                    "Tue Feb 4 Morning",
                    "\t1:1 with Bob (ignored, 10:00:00->10:30:00)",
                    "Tue Feb 4 Afternoon",
                    "Wed Feb 5 Morning",
                    "\tSync (meeting, 09:00:00->09:30:00)",
                    "Wed Feb 5 Afternoon",
                    "Thu Feb 6 Morning",
                    "\tReview (not accepted, 09:00:00->10:00:00)",
                    "Thu Feb 6 Afternoon",
                    "\tFocus time (personal, 14:00:00->16:00:00)",
                    "Fri Feb 7 Morning",
                    "Fri Feb 7 Afternoon",
                    "\tAll hands (declined, 15:00:00->16:00:00)",
                ]
            );
        }
    }
}
