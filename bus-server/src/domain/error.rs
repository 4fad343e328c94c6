//! Domain error types.
//!
//! These errors represent validation failures and data inconsistencies
//! in the domain layer. They are distinct from storage and HTTP errors.

use super::RouteId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A stop name that no configured route serves
    #[error("unknown stop: {0}")]
    UnknownStop(String),

    /// A route number that is not configured
    #[error("unknown route: {0}")]
    UnknownRoute(RouteId),

    /// The stop exists in the network but not on this route
    #[error("stop {stop} is not on route {route}")]
    StopNotOnRoute { route: RouteId, stop: String },

    /// Origin and destination name the same stop
    #[error("origin and destination must differ")]
    SameStops,

    /// Travel date is not a YYYY-MM-DD calendar date
    #[error("invalid travel date: {0}")]
    InvalidDate(String),

    /// Static route configuration is malformed
    #[error("invalid configuration for route {route}: {reason}")]
    InvalidRouteConfig { route: String, reason: String },
}
