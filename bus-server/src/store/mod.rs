//! Persistence contracts and in-process implementations.
//!
//! The booking pipeline talks to three external collaborators: a shared
//! document store, a per-session draft store and an identity provider.
//! Each is a trait here so that tests can substitute failing or
//! instrumented versions.

mod context;
mod document;
mod draft;
mod memory;
mod records;

pub use context::{Clock, FixedClock, FixedIdentity, IdentityProvider, SystemClock, UserId};
pub use document::{Document, DocumentStore, Filter, Order, Query, StoreError};
pub use draft::{DraftStore, SessionDraftStore};
pub use memory::MemoryStore;
pub use records::{
    BOOKINGS, CONFIRMED_BOOKINGS, ConfirmedBooking, NOTIFICATIONS, NotificationKind,
    NotificationRecord, SEATS_FIELD, SeatInventory, decode, encode, inventory_key,
};
