use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::pii::Masked;

/// Display format for departure times in messages, e.g. `11:15AM Oct 22 2009 PDT`.
pub const DISPLAY_TIME_FORMAT: &str = "%I:%M%p %b %d %Y %Z";

/// A passenger's reservation, identified by the airline-issued confirmation code.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub first_name: String,
    pub last_name: String,
    pub confirmation: Masked<String>,
    pub trip: Option<Trip>,
}

impl Reservation {
    pub fn new(first_name: String, last_name: String, confirmation: String) -> Self {
        Self {
            first_name,
            last_name,
            confirmation: Masked(confirmation),
            trip: None,
        }
    }

    /// Link the resolved trip. This is the only mutation a reservation sees.
    pub fn attach_trip(&mut self, trip: Trip) {
        self.trip = Some(trip);
    }

    pub fn passenger_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Look up a flight of the attached trip.
    pub fn flight(&self, leg: Leg) -> Option<&Flight> {
        self.trip.as_ref().and_then(|trip| trip.flight(leg))
    }

    /// Plain-text summary of the reservation and all of its flights.
    pub fn flight_info_message(&self) -> String {
        let mut message = self.header();
        if let Some(trip) = &self.trip {
            message.push_str("Departing Flight:\n");
            for flight in &trip.outbound {
                message.push_str(&flight.summary());
            }
            if !trip.is_one_way() {
                message.push_str("\nReturning Flight:\n");
                for flight in &trip.inbound {
                    message.push_str(&flight.summary());
                }
            }
        }
        message
    }

    /// Summary restricted to a single flight, used in per-flight outcome messages.
    pub fn single_flight_message(&self, leg: Leg) -> String {
        let mut message = self.header();
        if let Some(flight) = self.flight(leg) {
            message.push_str(&format!("{} Flight:\n", leg.direction));
            message.push_str(&flight.summary());
        }
        message
    }

    fn header(&self) -> String {
        format!(
            "Confirmation number: {}\nPassenger name: {}\n",
            self.confirmation.expose(),
            self.passenger_name()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outbound,
    Return,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "Departing"),
            Direction::Return => write!(f, "Returning"),
        }
    }
}

/// Addresses one flight inside a trip without copying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leg {
    pub direction: Direction,
    pub index: usize,
}

impl Leg {
    pub fn outbound(index: usize) -> Self {
        Self { direction: Direction::Outbound, index }
    }

    pub fn inbound(index: usize) -> Self {
        Self { direction: Direction::Return, index }
    }
}

/// Outbound and return flights of a reservation. Neither list is ever empty; a one-way
/// trip carries its flight on both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub outbound: Vec<Flight>,
    pub inbound: Vec<Flight>,
}

impl Trip {
    pub fn new(outbound: Vec<Flight>, inbound: Vec<Flight>) -> Result<Self, TripError> {
        if outbound.is_empty() {
            return Err(TripError::MissingFlights(Direction::Outbound));
        }
        if inbound.is_empty() {
            return Err(TripError::MissingFlights(Direction::Return));
        }
        Ok(Self { outbound, inbound })
    }

    pub fn flight(&self, leg: Leg) -> Option<&Flight> {
        match leg.direction {
            Direction::Outbound => self.outbound.get(leg.index),
            Direction::Return => self.inbound.get(leg.index),
        }
    }

    /// Every return flight is also an outbound one.
    pub fn is_one_way(&self) -> bool {
        self.inbound.iter().all(|f| self.outbound.contains(f))
    }

    /// Every distinct flight with its leg, outbound first.
    pub fn flights(&self) -> impl Iterator<Item = (Leg, &Flight)> {
        let outbound = self
            .outbound
            .iter()
            .enumerate()
            .map(|(i, f)| (Leg::outbound(i), f));
        let inbound = self
            .inbound
            .iter()
            .enumerate()
            .filter(|(_, f)| !self.outbound.contains(f))
            .map(|(i, f)| (Leg::inbound(i), f));
        outbound.chain(inbound)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TripError {
    #[error("Trip has no {0} flights")]
    MissingFlights(Direction),
}

/// A single flight segment. Departure time carries the departure airport's zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flight {
    pub number: u32,
    pub depart_airport: String,
    pub departs_at: DateTime<Tz>,
    // Not populated by the itinerary page yet.
    pub arrive_airport: Option<String>,
    pub arrives_at: Option<DateTime<Tz>>,
}

impl Flight {
    pub fn new(number: u32, depart_airport: String, departs_at: DateTime<Tz>) -> Self {
        Self {
            number,
            depart_airport,
            departs_at,
            arrive_airport: None,
            arrives_at: None,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Flight {}:\n  Departs: {} @ {}\n",
            self.number,
            self.depart_airport,
            self.departs_at.format(DISPLAY_TIME_FORMAT)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardingGroup {
    A,
    B,
    C,
}

impl BoardingGroup {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'A' => Some(BoardingGroup::A),
            'B' => Some(BoardingGroup::B),
            'C' => Some(BoardingGroup::C),
            _ => None,
        }
    }
}

/// Boarding group letter plus sequence number, displayed as `B12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardingPosition {
    pub group: BoardingGroup,
    pub number: u32,
}

impl fmt::Display for BoardingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.group, self.number)
    }
}
