//! The booking draft and its per-session slot.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{CardBrand, ClockTime, PersonalDetails, RouteId, SeatId};
use crate::store::DraftStore;

use super::error::BookingError;

/// Pipeline stages, in the order a booking passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Searching,
    SeatSelecting,
    DetailsEntry,
    Payment,
    Commit,
    Confirmed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Searching => "search",
            Stage::SeatSelecting => "seat selection",
            Stage::DetailsEntry => "personal details",
            Stage::Payment => "payment",
            Stage::Commit => "commit",
            Stage::Confirmed => "confirmation",
        })
    }
}

/// The route, date and stops chosen at search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSelection {
    pub route: RouteId,
    pub date: NaiveDate,
    pub from: String,
    pub to: String,
}

/// What is kept of the card: never the full number or security code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub payment_method: CardBrand,
    pub card_last4: String,
}

/// The in-progress booking for one session.
///
/// Fields only ever accumulate; a later stage never clears what an
/// earlier stage wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripSelection>,
    #[serde(default)]
    pub seats: Vec<SeatId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInfo>,
    /// Seats an earlier commit attempt already wrote to the inventory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_seats: Vec<SeatId>,
}

impl BookingDraft {
    /// A fresh draft for a chosen trip.
    pub fn for_trip(trip: TripSelection) -> Self {
        Self {
            trip: Some(trip),
            ..Self::default()
        }
    }

    /// The furthest stage this draft has the data to enter.
    pub fn stage(&self) -> Stage {
        if self.trip.is_none() {
            Stage::Searching
        } else if self.seats.is_empty() || self.departure_time.is_none() {
            Stage::SeatSelecting
        } else if self.personal.is_none() {
            Stage::DetailsEntry
        } else if self.payment.is_none() {
            Stage::Payment
        } else {
            Stage::Commit
        }
    }

    /// Check that every stage before `target` has its data.
    ///
    /// On failure the error names the earliest stage that can supply what
    /// is missing. The draft itself is never touched.
    pub fn require(&self, target: Stage) -> Result<(), BookingError> {
        let reached = self.stage();
        if reached >= target {
            return Ok(());
        }
        let reason = match reached {
            Stage::Searching => "no trip selected",
            Stage::SeatSelecting => "no seats selected",
            Stage::DetailsEntry => "personal details missing",
            Stage::Payment => "payment details missing",
            Stage::Commit | Stage::Confirmed => "booking incomplete",
        };
        Err(BookingError::stale(reached, reason))
    }

    /// Remember that `seats` are now in the inventory for this trip.
    pub fn mark_merged(&mut self, seats: &[SeatId]) {
        for seat in seats {
            if !self.merged_seats.contains(seat) {
                self.merged_seats.push(seat.clone());
            }
        }
    }

    pub fn trip(&self) -> Result<&TripSelection, BookingError> {
        self.trip
            .as_ref()
            .ok_or_else(|| BookingError::stale(Stage::Searching, "no trip selected"))
    }
}

const PENDING_SUFFIX: &str = "pendingBooking";
const LAST_CODE_SUFFIX: &str = "lastBookingCode";

/// One session's draft slot plus its last confirmation code.
///
/// The draft is stored as JSON. A slot holding something that does not
/// parse is cleared and reported as stale, never patched up.
pub struct DraftSlot<'a, D> {
    store: &'a D,
    pending_key: String,
    code_key: String,
}

impl<'a, D: DraftStore> DraftSlot<'a, D> {
    pub fn new(store: &'a D, session: &str) -> Self {
        Self {
            store,
            pending_key: format!("{session}:{PENDING_SUFFIX}"),
            code_key: format!("{session}:{LAST_CODE_SUFFIX}"),
        }
    }

    /// The current draft, if there is one.
    pub async fn load(&self) -> Result<Option<BookingDraft>, BookingError> {
        let Some(raw) = self.store.read(&self.pending_key).await else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                warn!(key = %self.pending_key, error = %e, "discarding unreadable draft");
                self.store.clear(&self.pending_key).await;
                Err(BookingError::stale(Stage::Searching, "saved booking could not be read"))
            }
        }
    }

    /// The current draft, which must exist.
    pub async fn load_existing(&self) -> Result<BookingDraft, BookingError> {
        self.load()
            .await?
            .ok_or_else(|| BookingError::stale(Stage::Searching, "no booking in progress"))
    }

    pub async fn save(&self, draft: &BookingDraft) -> Result<(), BookingError> {
        let raw = serde_json::to_string(draft).map_err(crate::store::StoreError::from)?;
        self.store.write(&self.pending_key, raw).await;
        Ok(())
    }

    pub async fn clear(&self) {
        self.store.clear(&self.pending_key).await;
    }

    pub async fn last_code(&self) -> Option<String> {
        self.store.read(&self.code_key).await
    }

    pub async fn set_last_code(&self, code: &str) {
        self.store.write(&self.code_key, code.to_string()).await;
    }
}
