//! Intercity bus booking server.
//!
//! Searches routes between two stops, shows each route's timetable in the
//! direction of travel, and takes a traveler from seat selection through
//! payment to a confirmed booking with scheduled notifications.

pub mod booking;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod store;
pub mod timetable;
pub mod web;
