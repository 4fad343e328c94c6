//! Route direction resolution.
//!
//! A route is configured in one canonical direction, but buses run both
//! ways. Given an origin and destination, the resolver decides which way
//! the traveler is going and where the traveled segment lies in the
//! direction-corrected stop list.

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::domain::{DomainError, Route};

/// Direction of travel relative to the canonical stop order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

/// Which stops to show for a resolved route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preview {
    /// Every stop on the route.
    Full,
    /// Three stops including origin and destination.
    ThreeStop,
    /// Origin and destination only.
    Direct,
}

/// Error from direction resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("origin {0} is not on this route")]
    OriginMissing(String),

    #[error("destination {0} is not on this route")]
    DestinationMissing(String),

    #[error("origin and destination are the same stop")]
    SameStop,
}

/// A route's stops in travel order, with origin and destination located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    direction: Direction,
    full_stops: Vec<String>,
    from_index: usize,
    to_index: usize,
}

impl ResolvedRoute {
    /// Resolve an origin/destination pair against a canonical stop list.
    ///
    /// Names match case-insensitively. The stop list is kept as-is when
    /// the origin comes no later than the destination, and reversed
    /// otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use bus_server::timetable::{Direction, ResolvedRoute};
    ///
    /// let stops: Vec<String> = ["Jaffna", "Killinochchi", "Negombo", "Colombo"]
    ///     .iter().map(|s| s.to_string()).collect();
    ///
    /// let r = ResolvedRoute::resolve(&stops, "colombo", "killinochchi").unwrap();
    /// assert_eq!(r.direction(), Direction::Reverse);
    /// assert_eq!(r.full_stops()[0], "Colombo");
    /// assert_eq!((r.from_index(), r.to_index()), (0, 2));
    /// ```
    pub fn resolve(stops: &[String], from: &str, to: &str) -> Result<Self, ResolveError> {
        let find = |name: &str| {
            let name = name.trim();
            stops.iter().position(|s| s.eq_ignore_ascii_case(name))
        };

        let from_f = find(from).ok_or_else(|| ResolveError::OriginMissing(from.to_string()))?;
        let to_f = find(to).ok_or_else(|| ResolveError::DestinationMissing(to.to_string()))?;
        if from_f == to_f {
            return Err(ResolveError::SameStop);
        }

        let last = stops.len() - 1;
        let resolved = if from_f <= to_f {
            Self {
                direction: Direction::Forward,
                full_stops: stops.to_vec(),
                from_index: from_f,
                to_index: to_f,
            }
        } else {
            Self {
                direction: Direction::Reverse,
                full_stops: stops.iter().rev().cloned().collect(),
                from_index: last - from_f,
                to_index: last - to_f,
            }
        };

        Ok(resolved)
    }

    /// Resolve against a configured route, reporting failures as domain
    /// errors that name the route.
    pub fn for_route(route: &Route, from: &str, to: &str) -> Result<Self, DomainError> {
        Self::resolve(route.stops(), from, to).map_err(|e| match e {
            ResolveError::OriginMissing(stop) | ResolveError::DestinationMissing(stop) => {
                DomainError::StopNotOnRoute {
                    route: route.id().clone(),
                    stop,
                }
            }
            ResolveError::SameStop => DomainError::SameStops,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Stops in travel order.
    pub fn full_stops(&self) -> &[String] {
        &self.full_stops
    }

    /// Position of the origin in [`full_stops`](Self::full_stops).
    pub fn from_index(&self) -> usize {
        self.from_index
    }

    /// Position of the destination in [`full_stops`](Self::full_stops).
    pub fn to_index(&self) -> usize {
        self.to_index
    }

    /// The traveled portion, inclusive, as positions in `full_stops`.
    pub fn active_range(&self) -> RangeInclusive<usize> {
        self.from_index.min(self.to_index)..=self.from_index.max(self.to_index)
    }

    /// Positions in `full_stops` to display for a preview.
    ///
    /// Every preview contains the origin and the destination and keeps
    /// them in travel order.
    pub fn preview_positions(&self, preview: Preview) -> Vec<usize> {
        let n = self.full_stops.len();
        let (from, to) = (self.from_index, self.to_index);

        match preview {
            Preview::Full => (0..n).collect(),
            Preview::Direct => vec![from, to],
            Preview::ThreeStop if n <= 3 => (0..n).collect(),
            Preview::ThreeStop => {
                let (lo, hi) = (from.min(to), from.max(to));
                let mut picked = if lo > 0 {
                    // Show where the bus comes from.
                    vec![lo - 1, lo, hi]
                } else if hi >= 2 {
                    vec![lo, lo + 1, hi]
                } else {
                    vec![lo, hi, hi + 1]
                };
                picked.sort_unstable();
                picked.dedup();
                picked
            }
        }
    }

    /// Stop names for a preview, in travel order.
    pub fn preview(&self, preview: Preview) -> Vec<String> {
        self.preview_positions(preview)
            .into_iter()
            .map(|i| self.full_stops[i].clone())
            .collect()
    }
}
