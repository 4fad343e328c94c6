//! Web layer for the bus booking service.
//!
//! Exposes search, the booking stages and booking lookups as JSON
//! endpoints.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, USER_ID_HEADER, create_router};
pub use state::{AppState, Flow};
