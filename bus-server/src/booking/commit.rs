//! Seat allocation and booking commit.

use chrono::{NaiveDate, NaiveDateTime};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{ClockTime, Route, RouteId, Topology};
use crate::store::{
    BOOKINGS, CONFIRMED_BOOKINGS, ConfirmedBooking, DocumentStore, NOTIFICATIONS, SEATS_FIELD,
    SeatInventory, StoreError, UserId, decode, encode, inventory_key,
};
use crate::timetable::align;

use super::draft::{BookingDraft, Stage, TripSelection};
use super::error::{BookingError, LookupError};
use super::notify::derive_notifications;
use super::seats::SeatPicker;

/// Result of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Confirmation code (the confirmed booking's store key)
    pub code: String,
    pub booking: ConfirmedBooking,
    /// Notifications that were stored; failures are logged, not returned
    pub notifications_enqueued: usize,
}

/// Read the seat inventory for a route-date. A missing record is empty.
pub async fn load_inventory<S: DocumentStore>(
    store: &S,
    route: &RouteId,
    date: NaiveDate,
) -> Result<SeatInventory, StoreError> {
    let key = inventory_key(route, date);
    match store.get(BOOKINGS, &key).await? {
        Some(doc) => decode(BOOKINGS, &key, doc),
        None => Ok(SeatInventory::default()),
    }
}

/// Turns a complete draft into stored records.
pub struct Committer<'a, S> {
    store: &'a S,
    topology: &'a Topology,
    reject_seat_conflicts: bool,
}

impl<'a, S: DocumentStore> Committer<'a, S> {
    pub fn new(store: &'a S, topology: &'a Topology) -> Self {
        Self {
            store,
            topology,
            reject_seat_conflicts: true,
        }
    }

    /// Whether to re-read the inventory and refuse seats that another
    /// booking took since they were selected.
    pub fn reject_seat_conflicts(mut self, reject: bool) -> Self {
        self.reject_seat_conflicts = reject;
        self
    }

    /// Commit a draft.
    ///
    /// Seats are merged first; if that fails nothing else is written.
    /// Once merged, the seats are recorded in `draft.merged_seats`, so a
    /// retry after a later failure does not see them as taken. A failure
    /// to create the confirmed booking leaves the merged seats in place.
    /// Notification failures are logged and do not fail the commit.
    pub async fn commit(
        &self,
        draft: &mut BookingDraft,
        user: Option<UserId>,
        now: NaiveDateTime,
    ) -> Result<CommitOutcome, BookingError> {
        draft.require(Stage::Commit)?;
        let (Some(trip), Some(departure_time), Some(personal), Some(payment)) = (
            draft.trip.as_ref(),
            draft.departure_time,
            draft.personal.as_ref(),
            draft.payment.as_ref(),
        ) else {
            return Err(BookingError::stale(draft.stage(), "booking incomplete"));
        };
        let (trip, personal, payment) = (trip.clone(), personal.clone(), payment.clone());
        let route = self.topology.route(&trip.route).map_err(LookupError::from)?;

        if self.reject_seat_conflicts {
            let inventory = load_inventory(self.store, &trip.route, trip.date).await?;
            let taken =
                SeatPicker::resuming(&inventory, &draft.merged_seats).blocked(&draft.seats);
            if !taken.is_empty() {
                warn!(route = %trip.route, date = %trip.date, ?taken, "seat conflict at commit");
                return Err(BookingError::SeatConflict { seats: taken });
            }
        }

        // Step 1: union the seats into the shared inventory.
        let key = inventory_key(&trip.route, trip.date);
        let values = draft
            .seats
            .iter()
            .map(|s| Value::String(s.as_str().to_string()))
            .collect();
        self.store
            .merge_array_field(BOOKINGS, &key, SEATS_FIELD, values)
            .await
            .inspect_err(|e| warn!(%key, error = %e, "seat merge failed, aborting commit"))?;
        debug!(%key, seats = ?draft.seats, "seats merged");
        let seats = draft.seats.clone();
        draft.mark_merged(&seats);

        // Step 2: the confirmed booking; its key is the confirmation code.
        let booking = ConfirmedBooking {
            route: trip.route.clone(),
            from: trip.from.clone(),
            to: trip.to.clone(),
            travel_date: trip.date,
            departure_time,
            seats: draft.seats.clone(),
            personal,
            payment_method: payment.payment_method,
            card_last4: payment.card_last4.clone(),
            user_id: user.map(|u| u.as_str().to_string()),
            timestamp: now,
        };
        let code = self
            .store
            .create(CONFIRMED_BOOKINGS, encode(&booking)?)
            .await
            .inspect_err(|e| warn!(%key, error = %e, "confirmed booking write failed"))?;
        info!(
            %code,
            route = %booking.route,
            date = %booking.travel_date,
            seats = booking.seats.len(),
            "booking confirmed"
        );

        // Step 3: notifications, best effort.
        let departure = departure_at(route, &trip, departure_time);
        let notifications = derive_notifications(&code, &booking, departure, now);
        let writes = notifications.iter().map(|n| async move {
            let doc = encode(n)?;
            self.store.create(NOTIFICATIONS, doc).await
        });
        let results = join_all(writes).await;

        let mut enqueued = 0;
        for (n, result) in notifications.iter().zip(results) {
            match result {
                Ok(_) => enqueued += 1,
                Err(e) => warn!(%code, kind = ?n.kind, error = %e, "failed to enqueue notification"),
            }
        }

        Ok(CommitOutcome {
            code,
            booking,
            notifications_enqueued: enqueued,
        })
    }
}

/// Departure date-time at the origin, with overnight rollover applied.
///
/// Falls back to the travel date when the timetable cannot place the
/// origin.
fn departure_at(route: &Route, trip: &TripSelection, time: ClockTime) -> NaiveDateTime {
    align(route, std::slice::from_ref(&trip.from), trip.date)
        .into_iter()
        .next()
        .flatten()
        .map(|t| t.to_datetime())
        .unwrap_or_else(|| time.on(trip.date).to_datetime())
}
