//! The booking state machine.
//!
//! Each method is one stage transition for one session: it loads the
//! session's draft, checks that the earlier stages are complete, validates
//! the new input and saves the extended draft. A rejected transition
//! leaves the stored draft as it was, except that a commit which got as
//! far as merging seats records them.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ClockTime, RouteId, SearchQuery, SeatId, Topology};
use crate::store::{
    CONFIRMED_BOOKINGS, Clock, ConfirmedBooking, DocumentStore, DraftStore, IdentityProvider,
    NOTIFICATIONS, NotificationRecord, Order, Query, UserId, decode,
};
use crate::timetable::{ResolvedRoute, RouteCard, seats_available};

use super::commit::{Committer, load_inventory};
use super::draft::{BookingDraft, DraftSlot, Stage, TripSelection};
use super::error::{BookingError, Field, LookupError, ValidationError};
use super::seats::{SeatPicker, SeatStatus};
use super::validate::{PaymentForm, PersonalForm};

/// How many bookings the journey history shows by default.
pub const DEFAULT_RECENT_LIMIT: usize = 4;

/// Behavior switches for the booking flow.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Refuse a commit if any requested seat was taken since selection.
    pub reject_seat_conflicts: bool,
    /// Booking closing time shown in availability text.
    pub closing_time: ClockTime,
}

impl FlowSettings {
    /// Settings with seat conflicts rejected.
    pub fn new(closing_time: ClockTime) -> Self {
        Self {
            reject_seat_conflicts: true,
            closing_time,
        }
    }
}

/// What the confirmation page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripSummary {
    pub code: String,
    pub route: RouteId,
    pub seats: Vec<SeatId>,
    pub from: String,
    pub to: String,
    pub travel_date: String,
    pub departure_time: ClockTime,
    pub payment: String,
}

impl TripSummary {
    pub fn new(code: &str, booking: &ConfirmedBooking) -> Self {
        Self {
            code: code.to_string(),
            route: booking.route.clone(),
            seats: booking.seats.clone(),
            from: booking.from.clone(),
            to: booking.to.clone(),
            travel_date: booking.travel_date.format("%Y-%m-%d").to_string(),
            departure_time: booking.departure_time,
            payment: booking.payment_method.label().to_string(),
        }
    }

    /// "From – To", as on the ticket.
    pub fn journey(&self) -> String {
        format!("{} – {}", self.from, self.to)
    }

    /// Seat labels joined for display, e.g. "A1, A2".
    pub fn seat_list(&self) -> String {
        self.seats
            .iter()
            .map(SeatId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Occupied seats and remaining capacity for a route-date.
#[derive(Debug, Clone, Serialize)]
pub struct SeatAvailability {
    pub route: RouteId,
    pub occupied: Vec<SeatId>,
    pub capacity: u32,
    pub available: u32,
}

/// The booking pipeline over a document store and a draft store.
pub struct BookingFlow<S, D> {
    store: Arc<S>,
    drafts: Arc<D>,
    topology: Arc<Topology>,
    clock: Arc<dyn Clock>,
    settings: FlowSettings,
}

impl<S, D> Clone for BookingFlow<S, D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            drafts: Arc::clone(&self.drafts),
            topology: Arc::clone(&self.topology),
            clock: Arc::clone(&self.clock),
            settings: self.settings.clone(),
        }
    }
}

impl<S: DocumentStore, D: DraftStore> BookingFlow<S, D> {
    pub fn new(
        store: Arc<S>,
        drafts: Arc<D>,
        topology: Arc<Topology>,
        clock: Arc<dyn Clock>,
        settings: FlowSettings,
    ) -> Self {
        Self {
            store,
            drafts,
            topology,
            clock,
            settings,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    fn slot<'a>(&'a self, session: &str) -> DraftSlot<'a, D> {
        DraftSlot::new(&self.drafts, session)
    }

    /// The session's draft, if a booking is in progress.
    pub async fn draft(&self, session: &str) -> Result<Option<BookingDraft>, BookingError> {
        self.slot(session).load().await
    }

    /// Route cards for every route serving a search.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RouteCard>, BookingError> {
        let mut cards = Vec::new();
        for route in self.topology.routes_serving(&query.from, &query.to) {
            let inventory = load_inventory(self.store.as_ref(), route.id(), query.date).await?;
            cards.push(RouteCard::build(
                route,
                &query.from,
                &query.to,
                query.date,
                inventory.len(),
                self.settings.closing_time,
            )?);
        }
        debug!(
            from = %query.from,
            to = %query.to,
            date = %query.date,
            routes = cards.len(),
            "search"
        );
        Ok(cards)
    }

    /// Occupied seats for a route on a date.
    pub async fn availability(
        &self,
        route: &RouteId,
        date: NaiveDate,
    ) -> Result<SeatAvailability, BookingError> {
        let capacity = self.topology.route(route)?.capacity();
        let inventory = load_inventory(self.store.as_ref(), route, date).await?;
        Ok(SeatAvailability {
            route: route.clone(),
            available: seats_available(capacity, inventory.len()),
            capacity,
            occupied: inventory.seats,
        })
    }

    /// Start a booking for a route found by a search. Replaces any
    /// draft the session already had.
    pub async fn begin(
        &self,
        session: &str,
        route: &RouteId,
        query: &SearchQuery,
    ) -> Result<BookingDraft, BookingError> {
        let found = self.topology.route(route)?;
        ResolvedRoute::for_route(found, &query.from, &query.to)?;

        let draft = BookingDraft::for_trip(TripSelection {
            route: route.clone(),
            date: query.date,
            from: query.from.clone(),
            to: query.to.clone(),
        });
        self.slot(session).save(&draft).await?;
        debug!(session, %route, "booking started");
        Ok(draft)
    }

    /// Attach the chosen seats and the departure time at the origin.
    pub async fn submit_seats(
        &self,
        session: &str,
        seats: &[String],
    ) -> Result<BookingDraft, BookingError> {
        let slot = self.slot(session);
        let mut draft = slot.load_existing().await?;
        draft.require(Stage::SeatSelecting)?;
        let trip = draft.trip()?.clone();

        let mut chosen: Vec<SeatId> = Vec::with_capacity(seats.len());
        for raw in seats {
            let seat = SeatId::parse(raw).map_err(|e| {
                ValidationError::new(Field::Seats, format!("Invalid seat {raw:?}: {e}"))
            })?;
            if !chosen.contains(&seat) {
                chosen.push(seat);
            }
        }
        if chosen.is_empty() {
            return Err(
                ValidationError::new(Field::Seats, "Please select at least one seat.").into(),
            );
        }

        let route = self.topology.route(&trip.route)?;
        let inventory = load_inventory(self.store.as_ref(), &trip.route, trip.date).await?;
        let mut picker = SeatPicker::resuming(&inventory, &draft.merged_seats);
        let taken: Vec<SeatId> = chosen
            .iter()
            .filter(|s| picker.hold((*s).clone()) == SeatStatus::Occupied)
            .cloned()
            .collect();
        if !taken.is_empty() {
            return Err(BookingError::SeatConflict { seats: taken });
        }

        let available = seats_available(route.capacity(), picker.occupied_count());
        if chosen.len() > available as usize {
            return Err(ValidationError::new(
                Field::Seats,
                format!("Only {available} seats are available."),
            )
            .into());
        }

        let departure = route.departure_at(&trip.from).ok_or_else(|| LookupError::NoDeparture {
            route: trip.route.clone(),
            stop: trip.from.clone(),
        })?;

        draft.seats = chosen;
        draft.departure_time = Some(departure);
        slot.save(&draft).await?;
        debug!(session, seats = ?draft.seats, %departure, "seats selected");
        Ok(draft)
    }

    /// Merge validated personal details into the draft.
    pub async fn submit_details(
        &self,
        session: &str,
        form: &PersonalForm,
    ) -> Result<BookingDraft, BookingError> {
        let slot = self.slot(session);
        let mut draft = slot.load_existing().await?;
        draft.require(Stage::DetailsEntry)?;

        draft.personal = Some(form.validate()?);
        slot.save(&draft).await?;
        debug!(session, "personal details saved");
        Ok(draft)
    }

    /// Merge the card brand and last four digits into the draft.
    pub async fn submit_payment(
        &self,
        session: &str,
        form: &PaymentForm,
    ) -> Result<BookingDraft, BookingError> {
        let slot = self.slot(session);
        let mut draft = slot.load_existing().await?;
        draft.require(Stage::Payment)?;

        let today = self.clock.now().date();
        draft.payment = Some(form.validate(today)?);
        slot.save(&draft).await?;
        debug!(session, "payment details saved");
        Ok(draft)
    }

    /// Commit the session's draft.
    ///
    /// On success the draft is cleared and the confirmation code is kept
    /// for the confirmation page. On failure the draft is kept; the only
    /// change is a record of seats already merged, so a retry can finish.
    pub async fn commit(
        &self,
        session: &str,
        identity: &impl IdentityProvider,
    ) -> Result<TripSummary, BookingError> {
        let slot = self.slot(session);
        let mut draft = slot.load_existing().await?;
        draft.require(Stage::Commit)?;
        let merged_before = draft.merged_seats.len();

        let result = Committer::new(self.store.as_ref(), &self.topology)
            .reject_seat_conflicts(self.settings.reject_seat_conflicts)
            .commit(&mut draft, identity.current_user_id(), self.clock.now())
            .await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(session, error = %e, "commit failed, draft kept");
                if draft.merged_seats.len() != merged_before
                    && let Err(save) = slot.save(&draft).await
                {
                    warn!(session, error = %save, "could not record merged seats");
                }
                return Err(e);
            }
        };

        slot.clear().await;
        slot.set_last_code(&outcome.code).await;
        info!(
            session,
            code = %outcome.code,
            notifications = outcome.notifications_enqueued,
            "commit complete"
        );
        Ok(TripSummary::new(&outcome.code, &outcome.booking))
    }

    /// Summary of the session's most recent confirmed booking.
    pub async fn confirmation(&self, session: &str) -> Result<TripSummary, BookingError> {
        let code = self
            .slot(session)
            .last_code()
            .await
            .ok_or_else(|| BookingError::stale(Stage::Searching, "no confirmed booking"))?;
        let booking = self.booking(&code).await?;
        Ok(TripSummary::new(&code, &booking))
    }

    /// A confirmed booking by its confirmation code.
    pub async fn booking(&self, code: &str) -> Result<ConfirmedBooking, BookingError> {
        let doc = self
            .store
            .get(CONFIRMED_BOOKINGS, code)
            .await?
            .ok_or_else(|| LookupError::UnknownBooking(code.to_string()))?;
        Ok(decode(CONFIRMED_BOOKINGS, code, doc)?)
    }

    /// The most recent bookings, newest first.
    pub async fn recent_bookings(&self, limit: usize) -> Result<Vec<TripSummary>, BookingError> {
        let query = Query::new().order_by("timestamp", Order::Descending).limit(limit);
        let docs = self.store.query(CONFIRMED_BOOKINGS, &query).await?;
        let mut summaries = Vec::with_capacity(docs.len());
        for (code, doc) in docs {
            let booking: ConfirmedBooking = decode(CONFIRMED_BOOKINGS, &code, doc)?;
            summaries.push(TripSummary::new(&code, &booking));
        }
        Ok(summaries)
    }

    /// Notifications owned by a user, newest first.
    pub async fn notifications_for(
        &self,
        user: &UserId,
    ) -> Result<Vec<NotificationRecord>, BookingError> {
        let query = Query::new()
            .eq("userId", user.as_str())
            .order_by("timestamp", Order::Descending);
        let docs = self.store.query(NOTIFICATIONS, &query).await?;
        let records = docs
            .into_iter()
            .map(|(key, doc)| decode(NOTIFICATIONS, &key, doc))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
