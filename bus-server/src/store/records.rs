//! Typed records and their mapping to stored documents.
//!
//! Documents cross the store boundary as untyped JSON. Everything past
//! this module works with the typed records; a document that does not fit
//! is reported as [`StoreError::Corrupt`] instead of leaking partial data.

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CardBrand, ClockTime, PersonalDetails, RouteId, SeatId};

use super::document::{Document, StoreError};

/// Seat inventories, keyed by [`inventory_key`].
pub const BOOKINGS: &str = "bookings";
/// Array field in a seat inventory holding the occupied seats.
pub const SEATS_FIELD: &str = "seats";
pub const CONFIRMED_BOOKINGS: &str = "confirmedBookings";
pub const NOTIFICATIONS: &str = "notifications";

/// Key of the seat inventory for a route on a date, e.g. "02_2025-07-01".
pub fn inventory_key(route: &RouteId, date: NaiveDate) -> String {
    format!("{route}_{}", date.format("%Y-%m-%d"))
}

/// Occupied seats for one route-date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInventory {
    #[serde(default)]
    pub seats: Vec<SeatId>,
}

impl SeatInventory {
    pub fn contains(&self, seat: &SeatId) -> bool {
        self.seats.contains(seat)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

/// An immutable record of a completed booking.
///
/// Its store key is the confirmation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedBooking {
    pub route: RouteId,
    pub from: String,
    pub to: String,
    pub travel_date: NaiveDate,
    pub departure_time: ClockTime,
    pub seats: Vec<SeatId>,
    pub personal: PersonalDetails,
    pub payment_method: CardBrand,
    pub card_last4: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub timestamp: NaiveDateTime,
}

/// Which of a booking's notifications a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Greeting,
    Reminder,
    Departure,
}

/// A time-stamped message for the delivery process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub booking_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub kind: NotificationKind,
    pub message: String,
    /// When the notification is due
    pub timestamp: NaiveDateTime,
    /// Flipped to true once by the delivery process, never reset
    #[serde(default)]
    pub delivered: bool,
}

/// Map a stored document onto a typed record.
pub fn decode<T: DeserializeOwned>(
    collection: &str,
    key: &str,
    doc: Document,
) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::Corrupt {
        collection: collection.to_string(),
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Map a typed record onto a document.
pub fn encode<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Serde(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}
