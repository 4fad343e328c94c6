//! Domain types for the bus booking service.
//!
//! This module contains the core domain model types that represent
//! validated route and booking data. All types enforce their invariants
//! at construction time, so code that receives these types can trust
//! their validity.

mod error;
mod ids;
mod passenger;
mod query;
mod route;
mod time;

pub use error::DomainError;
pub use ids::{InvalidRouteId, InvalidSeatId, RouteId, SeatId};
pub use passenger::{CardBrand, PersonalDetails};
pub use query::{SearchQuery, parse_date};
pub use route::{Route, RouteConfig, Topology};
pub use time::{ClockTime, StopTime, TimeError, format_date_short};
