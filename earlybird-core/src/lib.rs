pub mod iata;
pub mod markup;
pub mod notify;
pub mod site;
pub mod window;

pub use iata::{AirportError, TimeZoneResolver};
pub use markup::{CheckinForm, FlightBlock, FormLookupError, SiteMarkup};
pub use notify::{ArtifactName, ArtifactStore, Notifier};
pub use site::{SiteClient, TransportError};
pub use window::{CheckinWindow, WindowError};

/// What a failure means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSeverity {
    /// The site or the network is unavailable: stop everything.
    Abort,
    /// No usable flight data for one reservation: carry on with the others.
    SkipReservation,
    /// Transient: try the same step again later.
    Retry,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Airport(#[from] AirportError),
    #[error(transparent)]
    Window(#[from] WindowError),
}

pub type CoreResult<T> = Result<T, CoreError>;
