//! Static route configuration: the stop topology and timetables.
//!
//! Routes are immutable once loaded. Each route lists its stops in
//! canonical (forward) order with one departure time per stop position.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{ClockTime, DomainError, RouteId};

/// Configuration entry for one route, in the on-disk JSON shape.
///
/// Times are kept as strings here and validated by [`Route::from_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub stops: Vec<String>,
    pub times: Vec<String>,
    pub fare: String,
    pub capacity: u32,
}

/// A bus route with its canonical stop order and timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    id: RouteId,
    stops: Vec<String>,
    times: Vec<ClockTime>,
    fare: String,
    capacity: u32,
}

impl Route {
    /// Build a route from a configuration entry.
    ///
    /// Stop names must be non-empty and unique ignoring case, since stops
    /// are looked up by name. A time list whose length differs from the
    /// stop list is accepted; such routes render placeholder times.
    pub fn from_config(id: RouteId, config: RouteConfig) -> Result<Self, DomainError> {
        let invalid = |reason: String| DomainError::InvalidRouteConfig {
            route: id.to_string(),
            reason,
        };

        if config.stops.is_empty() {
            return Err(invalid("no stops".into()));
        }

        let mut seen = HashSet::new();
        let mut stops = Vec::with_capacity(config.stops.len());
        for stop in config.stops {
            let stop = stop.trim().to_string();
            if stop.is_empty() {
                return Err(invalid("empty stop name".into()));
            }
            if !seen.insert(stop.to_lowercase()) {
                return Err(invalid(format!("duplicate stop {stop}")));
            }
            stops.push(stop);
        }

        let times = config
            .times
            .iter()
            .map(|t| ClockTime::parse_hhmm(t).map_err(|e| invalid(format!("{t}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            stops,
            times,
            fare: config.fare,
            capacity: config.capacity,
        })
    }

    /// Returns the route id.
    pub fn id(&self) -> &RouteId {
        &self.id
    }

    /// Stop names in canonical order.
    pub fn stops(&self) -> &[String] {
        &self.stops
    }

    /// Departure times in canonical order, one per stop position.
    pub fn times(&self) -> &[ClockTime] {
        &self.times
    }

    /// Fare text, e.g. "1500 LKR / seat".
    pub fn fare(&self) -> &str {
        &self.fare
    }

    /// Total seat capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether every stop has exactly one timetable entry.
    pub fn has_exact_timetable(&self) -> bool {
        self.times.len() == self.stops.len()
    }

    /// Canonical index of a stop, matched case-insensitively.
    pub fn stop_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.stops.iter().position(|s| s.eq_ignore_ascii_case(name))
    }

    /// Canonical spelling of a stop on this route.
    pub fn canonical_stop(&self, name: &str) -> Option<&str> {
        self.stop_index(name).map(|i| self.stops[i].as_str())
    }

    /// Whether this route calls at both stops.
    pub fn serves(&self, from: &str, to: &str) -> bool {
        self.stop_index(from).is_some() && self.stop_index(to).is_some()
    }

    /// Timetabled departure at a stop, by canonical index.
    ///
    /// Returns `None` if the stop is unknown or the timetable is not
    /// exact, so that a neighbouring stop's time is never reported.
    pub fn departure_at(&self, stop: &str) -> Option<ClockTime> {
        if !self.has_exact_timetable() {
            return None;
        }
        self.stop_index(stop).map(|i| self.times[i])
    }
}

/// The stop topology: every configured route, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    routes: BTreeMap<RouteId, Route>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, replacing any existing route with the same id.
    pub fn insert(&mut self, route: Route) {
        self.routes.insert(route.id.clone(), route);
    }

    /// Build a topology from the JSON route mapping
    /// `{ "<route>": { "stops": [..], "times": [..], "fare": "..", "capacity": n } }`.
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let raw: BTreeMap<String, RouteConfig> =
            serde_json::from_str(json).map_err(|e| DomainError::InvalidRouteConfig {
                route: "*".into(),
                reason: e.to_string(),
            })?;

        let mut topology = Self::new();
        for (id, config) in raw {
            let route_id = RouteId::parse(&id).map_err(|e| DomainError::InvalidRouteConfig {
                route: id.clone(),
                reason: e.to_string(),
            })?;
            topology.insert(Route::from_config(route_id, config)?);
        }
        Ok(topology)
    }

    /// The four routes of the SLTB northern corridor.
    pub fn builtin() -> Self {
        let entries: [(&str, &[&str], &[&str], u32); 4] = [
            (
                "02",
                &["Jaffna", "Killinochchi", "Negombo", "Colombo"],
                &["20:00", "21:00", "01:00", "04:00"],
                40,
            ),
            (
                "20",
                &["Jaffna", "Killinochchi", "Negombo"],
                &["04:00", "20:00", "01:00"],
                9,
            ),
            ("222", &["Killinochchi", "Negombo"], &["20:00", "01:00"], 40),
            (
                "202",
                &["Killinochchi", "Negombo", "Colombo"],
                &["20:00", "21:00", "04:00"],
                0,
            ),
        ];

        let mut topology = Self::new();
        for (id, stops, times, capacity) in entries {
            let config = RouteConfig {
                stops: stops.iter().map(|s| s.to_string()).collect(),
                times: times.iter().map(|s| s.to_string()).collect(),
                fare: "1500 LKR / seat".into(),
                capacity,
            };
            // Built-in data is known valid.
            if let Ok(id) = RouteId::parse(id)
                && let Ok(route) = Route::from_config(id, config)
            {
                topology.insert(route);
            }
        }
        topology
    }

    /// Look up a route by id.
    pub fn route(&self, id: &RouteId) -> Result<&Route, DomainError> {
        self.routes
            .get(id)
            .ok_or_else(|| DomainError::UnknownRoute(id.clone()))
    }

    /// All routes in id order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Number of configured routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Canonical spelling of a stop anywhere in the network.
    pub fn canonical_stop(&self, name: &str) -> Option<&str> {
        self.routes.values().find_map(|r| r.canonical_stop(name))
    }

    /// Routes calling at both stops, in id order.
    pub fn routes_serving(&self, from: &str, to: &str) -> Vec<&Route> {
        self.routes.values().filter(|r| r.serves(from, to)).collect()
    }
}
