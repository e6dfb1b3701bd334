use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::reservation::{BoardingPosition, DISPLAY_TIME_FORMAT};

/// Outcomes worth telling the passenger about. Each one renders to a plain-text message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckinEvent {
    FlightScheduled {
        flight_info: String,
        trigger_at: DateTime<Utc>,
    },
    FlightSkipped {
        flight_info: String,
        trigger_at: DateTime<Utc>,
    },
    CheckedIn {
        flight_info: String,
        position: Option<BoardingPosition>,
        attempt: u32,
    },
    CheckinAbandoned {
        flight_info: String,
        attempts: u32,
    },
}

impl CheckinEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            CheckinEvent::FlightScheduled { .. } => "Waiting for SW flight",
            CheckinEvent::FlightSkipped { .. } => "Flight not scheduled",
            CheckinEvent::CheckedIn { .. } => "Flight checked in!",
            CheckinEvent::CheckinAbandoned { .. } => "Flight check in failed",
        }
    }

    pub fn body(&self) -> String {
        match self {
            CheckinEvent::FlightScheduled { flight_info, trigger_at } => format!(
                "Check in scheduled for {}\n{}",
                trigger_at.format(DISPLAY_TIME_FORMAT),
                flight_info
            ),
            CheckinEvent::FlightSkipped { flight_info, trigger_at } => format!(
                "Check in window opened at {}, flight already left!\n{}",
                trigger_at.format(DISPLAY_TIME_FORMAT),
                flight_info
            ),
            CheckinEvent::CheckedIn { flight_info, position: Some(position), .. } => {
                format!("SUCCESS.  Checked in at position {}\n{}", position, flight_info)
            }
            CheckinEvent::CheckedIn { flight_info, position: None, .. } => format!(
                "SUCCESS.  Checked in, but the boarding position was not found on the boarding pass\n{}",
                flight_info
            ),
            CheckinEvent::CheckinAbandoned { flight_info, attempts } => format!(
                "FAILURE.  Too many failures ({} attempts), giving up.\n{}",
                attempts, flight_info
            ),
        }
    }
}
