use std::sync::Arc;

use chrono::{DateTime, Utc};
use earlybird_shared::{BoardingPosition, Flight, Leg, Masked, Reservation};
use serde::Serialize;
use uuid::Uuid;

/// Task status in the check-in lifecycle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Succeeded { position: Option<BoardingPosition> },
    Exhausted { attempts: u32 },
    Cancelled,
}

/// One flight waiting for its check-in window.
///
/// Reservation and flight data are shared read-only; the scheduler only ever mutates
/// the trigger time, attempt counter and status.
#[derive(Debug, Clone)]
pub struct CheckinTask {
    pub id: Uuid,
    pub reservation: Arc<Reservation>,
    pub leg: Leg,
    pub trigger_at: DateTime<Utc>,
    pub attempt: u32,
    pub status: TaskStatus,
}

impl CheckinTask {
    pub fn new(reservation: Arc<Reservation>, leg: Leg, trigger_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reservation,
            leg,
            trigger_at,
            attempt: 1,
            status: TaskStatus::Pending,
        }
    }

    pub fn flight(&self) -> Option<&Flight> {
        self.reservation.flight(self.leg)
    }

    /// Message text for notifications about this flight.
    pub fn flight_info(&self) -> String {
        self.reservation.single_flight_message(self.leg)
    }

    pub fn report(&self) -> TaskReport {
        TaskReport {
            task_id: self.id,
            confirmation: self.reservation.confirmation.clone(),
            flight_number: self.flight().map(|f| f.number).unwrap_or_default(),
            status: self.status,
        }
    }
}

/// Final word on one scheduled flight.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_id: Uuid,
    pub confirmation: Masked<String>,
    pub flight_number: u32,
    pub status: TaskStatus,
}

impl TaskReport {
    /// One-line outcome, e.g. `checked in at B12` or `gave up after 73 attempts`.
    pub fn outcome(&self) -> String {
        match self.status {
            TaskStatus::Succeeded { position: Some(position) } => {
                format!("checked in at {}", position)
            }
            TaskStatus::Succeeded { position: None } => "position not found".to_string(),
            TaskStatus::Exhausted { attempts } => format!("gave up after {} attempts", attempts),
            TaskStatus::Cancelled => "cancelled".to_string(),
            TaskStatus::Pending => "pending".to_string(),
        }
    }
}
