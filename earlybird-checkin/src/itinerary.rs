use std::sync::Arc;

use chrono::{NaiveDateTime, TimeZone};
use earlybird_core::{
    AirportError, FailureSeverity, FlightBlock, SiteClient, SiteMarkup, TimeZoneResolver,
    TransportError,
};
use earlybird_shared::{Flight, Reservation, Trip};
use tracing::{debug, info};

/// `Thursday, October 22, 2009` + ` ` + `11:15 AM`
const DEPARTURE_FORMAT: &str = "%A, %B %d, %Y %I:%M %p";

#[derive(Debug, thiserror::Error)]
pub enum ItineraryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Itinerary lookup form not found")]
    MalformedLookupPage,
    #[error("Itinerary page has no usable flights")]
    NoItineraryData,
    #[error(transparent)]
    AirportCodeUnresolved(#[from] AirportError),
    #[error("Cannot read departure time {date:?} {time:?}")]
    InvalidDepartureTime { date: String, time: String },
}

impl ItineraryError {
    pub fn severity(&self) -> FailureSeverity {
        match self {
            ItineraryError::Transport(e) => match e.severity() {
                // Nothing retries an itinerary lookup; a slow site costs this reservation only.
                FailureSeverity::Retry => FailureSeverity::SkipReservation,
                other => other,
            },
            ItineraryError::MalformedLookupPage => FailureSeverity::Abort,
            ItineraryError::NoItineraryData
            | ItineraryError::AirportCodeUnresolved(_)
            | ItineraryError::InvalidDepartureTime { .. } => FailureSeverity::SkipReservation,
        }
    }
}

/// Turns a confirmation code into a [`Trip`]: fetch the lookup page, submit the
/// passenger's identity to the form it names, read the flights off the result.
pub struct ItineraryRetriever {
    client: Arc<dyn SiteClient>,
    markup: Arc<dyn SiteMarkup>,
    zones: TimeZoneResolver,
    itinerary_path: String,
}

impl ItineraryRetriever {
    pub fn new(
        client: Arc<dyn SiteClient>,
        markup: Arc<dyn SiteMarkup>,
        zones: TimeZoneResolver,
        itinerary_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            markup,
            zones,
            itinerary_path: itinerary_path.into(),
        }
    }

    pub async fn retrieve(&self, reservation: &Reservation) -> Result<Trip, ItineraryError> {
        info!(
            confirmation = %reservation.confirmation,
            "Looking up itinerary"
        );
        let lookup_page = self.client.get(&self.itinerary_path).await?;
        let target = self
            .markup
            .extract_lookup_target(&lookup_page)
            .ok_or(ItineraryError::MalformedLookupPage)?;

        let fields = vec![
            (
                "confirmationNumber".to_string(),
                reservation.confirmation.expose().to_string(),
            ),
            ("firstName".to_string(), reservation.first_name.clone()),
            ("lastName".to_string(), reservation.last_name.clone()),
        ];
        let itinerary_page = self.client.post_form(&target, &fields).await?;

        let blocks = self.markup.extract_flight_blocks(&itinerary_page);
        debug!(blocks = blocks.len(), "Itinerary page parsed");
        self.compose_trip(&blocks)
    }

    /// First block is the outbound flight, last block the return flight. Connections
    /// in between are not modelled. A lone block is a one-way trip.
    pub fn compose_trip(&self, blocks: &[FlightBlock]) -> Result<Trip, ItineraryError> {
        let (outbound, inbound) = match blocks {
            [] => return Err(ItineraryError::NoItineraryData),
            [only] => {
                let flight = self.flight_from_block(only)?;
                (flight.clone(), flight)
            }
            [first, .., last] => (self.flight_from_block(first)?, self.flight_from_block(last)?),
        };
        Trip::new(vec![outbound], vec![inbound]).map_err(|_| ItineraryError::NoItineraryData)
    }

    fn flight_from_block(&self, block: &FlightBlock) -> Result<Flight, ItineraryError> {
        let (Some(number), Some(airport), Some(time), Some(date)) = (
            block.flight_number,
            block.depart_airport.as_deref(),
            block.time_of_day.as_deref(),
            block.travel_date.as_deref(),
        ) else {
            return Err(ItineraryError::NoItineraryData);
        };

        let tz = self.zones.resolve(airport)?;
        let invalid = || ItineraryError::InvalidDepartureTime {
            date: date.to_string(),
            time: time.to_string(),
        };
        let naive = NaiveDateTime::parse_from_str(&format!("{} {}", date, time), DEPARTURE_FORMAT)
            .map_err(|_| invalid())?;
        // Ambiguous wall-clock times (DST fall-back) take the earlier instant.
        let departs_at = tz.from_local_datetime(&naive).earliest().ok_or_else(invalid)?;

        Ok(Flight::new(number, airport.to_ascii_uppercase(), departs_at))
    }
}
