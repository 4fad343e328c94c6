//! Booking pipeline errors.

use std::fmt;

use serde::Serialize;

use crate::domain::{DomainError, RouteId, SeatId};
use crate::store::StoreError;

use super::draft::Stage;

/// An input field that failed validation, so the client can highlight it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Seats,
    Name,
    Mobile,
    Nic,
    Email,
    Consent,
    CardBrand,
    CardNumber,
    ExpiryMonth,
    ExpiryYear,
    Cvv,
}

/// Malformed or missing user input for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A search or booking refers to something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("no booking with confirmation code {0}")]
    UnknownBooking(String),

    /// The route's timetable cannot give a departure time for the origin
    #[error("route {route} has no departure time at {stop}")]
    NoDeparture { route: RouteId, stop: String },
}

/// Error from a booking stage transition.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("storage failure: {0}")]
    Persistence(#[from] StoreError),

    /// The draft is missing, unreadable or lacks what this stage needs
    #[error("booking must restart at {restart_at}: {reason}")]
    StaleDraft { restart_at: Stage, reason: String },

    #[error("seats already taken: {}", SeatList(.seats))]
    SeatConflict { seats: Vec<SeatId> },
}

impl BookingError {
    pub(crate) fn stale(restart_at: Stage, reason: impl Into<String>) -> Self {
        Self::StaleDraft {
            restart_at,
            reason: reason.into(),
        }
    }

    /// The stage the user should be sent back to, or `None` to stay on
    /// the current one.
    pub fn restart_at(&self) -> Option<Stage> {
        match self {
            Self::Validation(_) => None,
            Self::Lookup(_) => Some(Stage::Searching),
            Self::Persistence(_) | Self::SeatConflict { .. } => Some(Stage::SeatSelecting),
            Self::StaleDraft { restart_at, .. } => Some(*restart_at),
        }
    }
}

impl From<DomainError> for BookingError {
    fn from(e: DomainError) -> Self {
        Self::Lookup(LookupError::Domain(e))
    }
}

struct SeatList<'a>(&'a [SeatId]);

impl fmt::Display for SeatList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seat) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{seat}")?;
        }
        Ok(())
    }
}
