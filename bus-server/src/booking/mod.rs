//! Multi-step booking: draft, validation, commit and notifications.
//!
//! A booking moves through [`Stage`]s. Each stage adds fields to a single
//! [`BookingDraft`] held in the session's draft slot; the commit stage
//! allocates seats, writes the [`ConfirmedBooking`](crate::store::ConfirmedBooking)
//! and derives its notifications.

mod commit;
mod draft;
mod error;
mod flow;
mod notify;
mod seats;
mod validate;

#[cfg(test)]
mod flow_tests;

pub use commit::{CommitOutcome, Committer, load_inventory};
pub use draft::{BookingDraft, DraftSlot, PaymentInfo, Stage, TripSelection};
pub use error::{BookingError, Field, LookupError, ValidationError};
pub use flow::{BookingFlow, DEFAULT_RECENT_LIMIT, FlowSettings, SeatAvailability, TripSummary};
pub use notify::{REMINDER_LEAD_MINUTES, derive_notifications};
pub use seats::{SeatPicker, SeatStatus};
pub use validate::{PaymentForm, PersonalForm};
