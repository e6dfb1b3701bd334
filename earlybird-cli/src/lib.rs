use std::sync::Arc;

use anyhow::Context;
use earlybird_checkin::{
    CheckinNavigator, CheckinRunner, Clock, ItineraryRetriever, RetryScheduler, RunSummary,
    SchedulerHandle,
};
use earlybird_core::Notifier;
use earlybird_shared::DISPLAY_TIME_FORMAT;
use earlybird_site::{
    Config, DirectoryArtifactStore, HttpSiteClient, LogNotifier, SmtpNotifier, SouthwestMarkup,
};

pub mod cli;

pub use cli::{Cli, UsageError};

/// Wire the site adapters into a runner. One HTTP client (and cookie jar) serves the
/// whole run.
pub fn build_runner(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<(CheckinRunner, SchedulerHandle)> {
    config.validate().context("Invalid configuration")?;
    let window = config.checkin_window()?;
    let zones = config.time_zones()?;

    let client = Arc::new(
        HttpSiteClient::from_config(&config.site).context("Failed to build HTTP client")?,
    );
    let markup = Arc::new(SouthwestMarkup::new());
    let artifacts = Arc::new(DirectoryArtifactStore::new(&config.artifacts.directory));
    let notifier: Arc<dyn Notifier> =
        match SmtpNotifier::from_config(&config.notify).context("Invalid mail settings")? {
            Some(mail) => Arc::new(mail),
            None => Arc::new(LogNotifier),
        };

    let retriever = ItineraryRetriever::new(
        client.clone(),
        markup.clone(),
        zones,
        config.site.itinerary_path.clone(),
    );
    let navigator = CheckinNavigator::new(
        client,
        markup,
        artifacts,
        config.site.checkin_path.clone(),
    );
    let (scheduler, handle) = RetryScheduler::new(
        window,
        config.attempt_timeout(),
        Arc::new(navigator),
        notifier,
        clock,
    );

    Ok((CheckinRunner::new(retriever, scheduler), handle))
}

/// `<CONF> flight <n>: <outcome>`, one line per flight, then one per flight that was
/// too late to schedule and one per reservation that could not be looked up.
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let flights = summary.reports.iter().map(|report| {
        format!(
            "{} flight {}: {}",
            report.confirmation.expose(),
            report.flight_number,
            report.outcome()
        )
    });
    let skipped = summary.skipped.iter().map(|skipped| {
        format!(
            "{} flight {}: not scheduled (check-in opened at {})",
            skipped.confirmation.expose(),
            skipped.flight_number,
            skipped.trigger_at.format(DISPLAY_TIME_FORMAT)
        )
    });
    let failed = summary
        .failed_reservations
        .iter()
        .map(|failed| format!("{}: not scheduled ({})", failed.confirmation.expose(), failed.error));
    flights.chain(skipped).chain(failed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use earlybird_checkin::{FailedReservation, ItineraryError, SkippedFlight, TaskReport, TaskStatus};
    use earlybird_shared::{BoardingGroup, BoardingPosition, Masked};
    use uuid::Uuid;

    fn report(confirmation: &str, flight_number: u32, status: TaskStatus) -> TaskReport {
        TaskReport {
            task_id: Uuid::new_v4(),
            confirmation: Masked(confirmation.to_string()),
            flight_number,
            status,
        }
    }

    #[test]
    fn test_summary_lines() {
        let summary = RunSummary {
            scheduled: 3,
            skipped: vec![SkippedFlight {
                confirmation: Masked("XYZ789".to_string()),
                flight_number: 34,
                trigger_at: Utc.with_ymd_and_hms(2009, 10, 24, 22, 42, 0).unwrap(),
            }],
            reports: vec![
                report(
                    "ABC123",
                    1476,
                    TaskStatus::Succeeded {
                        position: Some(BoardingPosition { group: BoardingGroup::B, number: 12 }),
                    },
                ),
                report("ABC123", 34, TaskStatus::Exhausted { attempts: 73 }),
                report("XYZ789", 9, TaskStatus::Cancelled),
            ],
            failed_reservations: vec![FailedReservation {
                confirmation: Masked("QRS456".to_string()),
                error: ItineraryError::NoItineraryData,
            }],
        };

        assert_eq!(
            summary_lines(&summary),
            vec![
                "ABC123 flight 1476: checked in at B12",
                "ABC123 flight 34: gave up after 73 attempts",
                "XYZ789 flight 9: cancelled",
                "XYZ789 flight 34: not scheduled (check-in opened at 10:42PM Oct 24 2009 UTC)",
                "QRS456: not scheduled (Itinerary page has no usable flights)",
            ]
        );
    }
}
