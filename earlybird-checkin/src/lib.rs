pub mod itinerary;
pub mod models;
pub mod navigator;
pub mod runner;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use itinerary::{ItineraryError, ItineraryRetriever};
pub use models::{CheckinTask, TaskReport, TaskStatus};
pub use navigator::{AttemptOutcome, CheckinAttempt, CheckinNavigator, SoftFailure};
pub use runner::{CheckinRunner, FailedReservation, RunError, RunSummary, SkippedFlight};
pub use scheduler::{Clock, RetryScheduler, ScheduleDecision, SchedulerError, SchedulerHandle, SystemClock};
