//! Route and seat identifier types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error returned when parsing an invalid route identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route id: {reason}")]
pub struct InvalidRouteId {
    reason: &'static str,
}

/// Error returned when parsing an invalid seat identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid seat id: {reason}")]
pub struct InvalidSeatId {
    reason: &'static str,
}

/// Longest route number accepted.
const MAX_ROUTE_LEN: usize = 8;

/// Longest seat label accepted.
const MAX_SEAT_LEN: usize = 4;

/// A bus route number such as "02" or "222".
///
/// Leading zeros are significant: "02" and "2" are different routes.
///
/// # Examples
///
/// ```
/// use bus_server::domain::RouteId;
///
/// let route = RouteId::parse("02").unwrap();
/// assert_eq!(route.as_str(), "02");
///
/// assert!(RouteId::parse("").is_err());
/// assert!(RouteId::parse("0 2").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(String);

impl RouteId {
    /// Parse a route id: 1 to 8 ASCII letters or digits.
    pub fn parse(s: &str) -> Result<Self, InvalidRouteId> {
        if s.is_empty() || s.len() > MAX_ROUTE_LEN {
            return Err(InvalidRouteId {
                reason: "must be 1-8 characters",
            });
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidRouteId {
                reason: "must be ASCII letters or digits",
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the route id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteId({})", self.0)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RouteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RouteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RouteId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A seat label on a bus seating plan, such as "A1" or "12".
///
/// Labels are normalized to uppercase so "a1" and "A1" are the same seat.
///
/// # Examples
///
/// ```
/// use bus_server::domain::SeatId;
///
/// assert_eq!(SeatId::parse("a1").unwrap().as_str(), "A1");
/// assert!(SeatId::parse("A-1").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId(String);

impl SeatId {
    /// Parse a seat label: 1 to 4 ASCII letters or digits, surrounding
    /// whitespace ignored.
    pub fn parse(s: &str) -> Result<Self, InvalidSeatId> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_SEAT_LEN {
            return Err(InvalidSeatId {
                reason: "must be 1-4 characters",
            });
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidSeatId {
                reason: "must be ASCII letters or digits",
            });
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns the seat label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeatId({})", self.0)
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SeatId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SeatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SeatId::parse(&s).map_err(serde::de::Error::custom)
    }
}
