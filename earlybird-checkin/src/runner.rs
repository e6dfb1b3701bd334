use std::sync::Arc;

use chrono::{DateTime, Utc};
use earlybird_core::FailureSeverity;
use earlybird_shared::{Leg, Masked, Reservation, DISPLAY_TIME_FORMAT};
use tracing::{debug, error, info, warn};

use crate::itinerary::{ItineraryError, ItineraryRetriever};
use crate::models::TaskReport;
use crate::scheduler::{RetryScheduler, ScheduleDecision, SchedulerError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Itinerary lookup failed: {0}")]
    Itinerary(#[from] ItineraryError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// A reservation that never made it to the scheduler.
#[derive(Debug)]
pub struct FailedReservation {
    pub confirmation: Masked<String>,
    pub error: ItineraryError,
}

/// A flight whose check-in window had already opened when it was looked up.
#[derive(Debug, Clone)]
pub struct SkippedFlight {
    pub confirmation: Masked<String>,
    pub flight_number: u32,
    pub trigger_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub scheduled: usize,
    pub skipped: Vec<SkippedFlight>,
    pub reports: Vec<TaskReport>,
    pub failed_reservations: Vec<FailedReservation>,
}

/// Looks up every reservation, queues its flights, then waits them out.
pub struct CheckinRunner {
    retriever: ItineraryRetriever,
    scheduler: RetryScheduler,
}

impl CheckinRunner {
    pub fn new(retriever: ItineraryRetriever, scheduler: RetryScheduler) -> Self {
        Self { retriever, scheduler }
    }

    pub async fn run(self, reservations: Vec<Reservation>) -> Result<RunSummary, RunError> {
        let Self { retriever, mut scheduler } = self;
        let mut summary = RunSummary::default();

        for mut reservation in reservations {
            let trip = match retriever.retrieve(&reservation).await {
                Ok(trip) => trip,
                Err(e) if e.severity() == FailureSeverity::Abort => {
                    error!(confirmation = %reservation.confirmation, error = %e, "Itinerary lookup failed");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(
                        confirmation = %reservation.confirmation,
                        error = %e,
                        "No flights to check in for this reservation"
                    );
                    summary.failed_reservations.push(FailedReservation {
                        confirmation: reservation.confirmation.clone(),
                        error: e,
                    });
                    continue;
                }
            };

            let legs: Vec<(Leg, u32)> = trip.flights().map(|(leg, f)| (leg, f.number)).collect();
            for (leg, flight) in trip.flights() {
                info!(
                    confirmation = %reservation.confirmation,
                    passenger = %reservation.passenger_name(),
                    direction = %leg.direction,
                    flight = flight.number,
                    departs = %flight.depart_airport,
                    departs_at = %flight.departs_at.format(DISPLAY_TIME_FORMAT),
                    "Flight found"
                );
            }
            reservation.attach_trip(trip);
            debug!(
                confirmation = %reservation.confirmation,
                "Flight information:\n{}",
                reservation.flight_info_message()
            );

            let reservation = Arc::new(reservation);
            for (leg, flight_number) in legs {
                match scheduler.schedule(Arc::clone(&reservation), leg).await? {
                    ScheduleDecision::Scheduled { .. } => summary.scheduled += 1,
                    ScheduleDecision::Skipped { trigger_at } => summary.skipped.push(SkippedFlight {
                        confirmation: reservation.confirmation.clone(),
                        flight_number,
                        trigger_at,
                    }),
                }
            }
        }

        summary.reports = scheduler.run().await?;
        Ok(summary)
    }
}
