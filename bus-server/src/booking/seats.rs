//! Seat picking before a selection is submitted.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::SeatId;
use crate::store::SeatInventory;

/// Display status of one seat on the seating plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Available,
    /// Chosen by this session, not yet committed
    Held,
    /// Committed by some booking
    Occupied,
}

/// Local seat-picker state for one session.
///
/// Occupied seats come from the inventory at the time the picker was
/// opened and cannot be held. Seats the session itself already wrote to
/// the inventory start out held instead.
#[derive(Debug, Clone, Default)]
pub struct SeatPicker {
    occupied: BTreeSet<SeatId>,
    held: BTreeSet<SeatId>,
}

impl SeatPicker {
    pub fn new(inventory: &SeatInventory) -> Self {
        Self::resuming(inventory, &[])
    }

    /// A picker for a session whose `merged` seats are already in
    /// `inventory` from an earlier, unfinished commit.
    pub fn resuming(inventory: &SeatInventory, merged: &[SeatId]) -> Self {
        let (held, occupied) = inventory
            .seats
            .iter()
            .cloned()
            .partition(|s| merged.contains(s));
        Self { occupied, held }
    }

    /// Hold a seat unless it is occupied. Returns the resulting status.
    pub fn hold(&mut self, seat: SeatId) -> SeatStatus {
        if self.occupied.contains(&seat) {
            return SeatStatus::Occupied;
        }
        self.held.insert(seat);
        SeatStatus::Held
    }

    /// Flip a seat between available and held. Returns the new status.
    pub fn toggle(&mut self, seat: SeatId) -> SeatStatus {
        if self.occupied.contains(&seat) {
            return SeatStatus::Occupied;
        }
        if self.held.remove(&seat) {
            SeatStatus::Available
        } else {
            self.held.insert(seat);
            SeatStatus::Held
        }
    }

    pub fn status(&self, seat: &SeatId) -> SeatStatus {
        if self.occupied.contains(seat) {
            SeatStatus::Occupied
        } else if self.held.contains(seat) {
            SeatStatus::Held
        } else {
            SeatStatus::Available
        }
    }

    /// Held seats in label order.
    pub fn held(&self) -> Vec<SeatId> {
        self.held.iter().cloned().collect()
    }

    /// Number of seats taken by other bookings.
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    /// The given seats that other bookings have taken.
    pub fn blocked(&self, seats: &[SeatId]) -> Vec<SeatId> {
        seats
            .iter()
            .filter(|s| self.occupied.contains(*s))
            .cloned()
            .collect()
    }
}
