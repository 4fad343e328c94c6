//! Display segments: the data a timeline rendering needs.
//!
//! Every page that draws a route timeline builds it here, from one
//! resolver call and one projection, so that direction handling and
//! rollover dates cannot drift between pages.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{ClockTime, DomainError, Route, RouteId, format_date_short};

use super::projector::{UNKNOWN_TIME, align};
use super::resolver::{Direction, Preview, ResolvedRoute};

/// Marker drawn above a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    From,
    To,
}

/// One stop on a rendered timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopView {
    pub name: String,
    /// "HH:MM", or [`UNKNOWN_TIME`] when the stop has no attributable time
    pub time: String,
    /// "DD Mon"
    pub date: String,
    /// Whether the stop lies within the traveled portion
    pub active: bool,
    pub marker: Option<Marker>,
}

/// A possibly-reversed, possibly-reduced stop sequence for one search.
///
/// Derived on every render and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplaySegment {
    pub route: RouteId,
    pub direction: Direction,
    pub stops: Vec<StopView>,
    /// Position of the first active stop in `stops`
    pub active_start: Option<usize>,
    /// Position of the last active stop in `stops`
    pub active_end: Option<usize>,
}

impl DisplaySegment {
    /// Build the segment for a resolved route and preview kind.
    pub fn build(
        route: &Route,
        resolved: &ResolvedRoute,
        preview: Preview,
        base_date: NaiveDate,
    ) -> Self {
        let positions = resolved.preview_positions(preview);
        let names: Vec<String> = positions
            .iter()
            .map(|&i| resolved.full_stops()[i].clone())
            .collect();
        let times = align(route, &names, base_date);
        let active = resolved.active_range();

        let stops: Vec<StopView> = positions
            .iter()
            .zip(names)
            .zip(times)
            .map(|((&pos, name), time)| {
                let marker = if pos == resolved.from_index() {
                    Some(Marker::From)
                } else if pos == resolved.to_index() {
                    Some(Marker::To)
                } else {
                    None
                };

                let (time, date) = match time {
                    Some(t) => (t.time().to_string(), format_date_short(t.date())),
                    None => (UNKNOWN_TIME.to_string(), format_date_short(base_date)),
                };

                StopView {
                    name,
                    time,
                    date,
                    active: active.contains(&pos),
                    marker,
                }
            })
            .collect();

        let active_start = stops.iter().position(|s| s.active);
        let active_end = stops.iter().rposition(|s| s.active);

        Self {
            route: route.id().clone(),
            direction: resolved.direction(),
            stops,
            active_start,
            active_end,
        }
    }

    /// Resolve and build in one step.
    pub fn for_route(
        route: &Route,
        from: &str,
        to: &str,
        preview: Preview,
        base_date: NaiveDate,
    ) -> Result<Self, DomainError> {
        let resolved = ResolvedRoute::for_route(route, from, to)?;
        Ok(Self::build(route, &resolved, preview, base_date))
    }

    /// Stop names in display order.
    pub fn stop_names(&self) -> Vec<&str> {
        self.stops.iter().map(|s| s.name.as_str()).collect()
    }
}

/// A route offered for a search, as shown in the route list.
#[derive(Debug, Clone, Serialize)]
pub struct RouteCard {
    pub route: RouteId,
    pub fare: String,
    pub full: DisplaySegment,
    pub three_stop: DisplaySegment,
    pub direct: DisplaySegment,
    pub seats_available: u32,
    pub availability: String,
}

impl RouteCard {
    /// Build the card for one route.
    ///
    /// `occupied` is the number of seats already taken on this route-date.
    pub fn build(
        route: &Route,
        from: &str,
        to: &str,
        base_date: NaiveDate,
        occupied: usize,
        closing: ClockTime,
    ) -> Result<Self, DomainError> {
        let resolved = ResolvedRoute::for_route(route, from, to)?;
        let seats_available = seats_available(route.capacity(), occupied);

        Ok(Self {
            route: route.id().clone(),
            fare: route.fare().to_string(),
            full: DisplaySegment::build(route, &resolved, Preview::Full, base_date),
            three_stop: DisplaySegment::build(route, &resolved, Preview::ThreeStop, base_date),
            direct: DisplaySegment::build(route, &resolved, Preview::Direct, base_date),
            seats_available,
            availability: availability_text(seats_available, base_date, closing),
        })
    }
}

/// Seats left on a route-date.
pub fn seats_available(capacity: u32, occupied: usize) -> u32 {
    let occupied = u32::try_from(occupied).unwrap_or(u32::MAX);
    capacity.saturating_sub(occupied)
}

/// Availability line, e.g. "40 Seats available – Closing : 01 Jul, 18:00".
pub fn availability_text(available: u32, date: NaiveDate, closing: ClockTime) -> String {
    if available == 0 {
        return "Sold out".to_string();
    }
    format!(
        "{available} Seats available – Closing : {}, {closing}",
        format_date_short(date)
    )
}
