//! Markup-dependent extraction.
//!
//! Everything that knows what the airline's HTML looks like sits behind [`SiteMarkup`].
//! A redesign of the site means a new implementation of this trait; scheduling, retry
//! and the check-in protocol itself stay untouched.

use earlybird_shared::BoardingPosition;

pub trait SiteMarkup: Send + Sync {
    /// Submission target of the itinerary lookup form.
    fn extract_lookup_target(&self, page: &str) -> Option<String>;

    /// Submission target of the check-in form on the check-in entry page.
    fn extract_checkin_target(&self, page: &str) -> Result<String, FormLookupError>;

    /// The page answering the identity submission.
    fn extract_checkin_form(&self, page: &str) -> CheckinForm;

    /// Raw flight detail blocks of an itinerary page, in document order.
    fn extract_flight_blocks(&self, page: &str) -> Vec<FlightBlock>;

    /// Boarding group and number from the final boarding pass page.
    fn extract_boarding_position(&self, page: &str) -> Option<BoardingPosition>;
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FormLookupError {
    #[error("Content container #{0} not found")]
    MissingContainer(String),
    #[error("No form with a submission target inside #{0}")]
    MissingForm(String),
}

/// What the site answered to the identity submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinForm {
    /// The error page: check-in not open yet, or identity rejected.
    Rejected,
    Ready {
        action: Option<String>,
        hidden_fields: Vec<(String, String)>,
    },
}

/// Values scraped from one flight detail block, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightBlock {
    pub flight_number: Option<u32>,
    pub depart_airport: Option<String>,
    pub time_of_day: Option<String>,
    pub travel_date: Option<String>,
}
