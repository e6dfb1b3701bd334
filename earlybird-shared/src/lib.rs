pub mod models;
pub mod pii;

pub use models::events::CheckinEvent;
pub use models::reservation::{
    BoardingGroup, BoardingPosition, Direction, Flight, Leg, Reservation, Trip, TripError,
    DISPLAY_TIME_FORMAT,
};
pub use pii::Masked;
