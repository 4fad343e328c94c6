//! Service configuration from environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{ClockTime, DomainError, Topology};

/// Error from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read routes file {path}: {source}")]
    RoutesFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid routes file {path}: {source}")]
    Routes { path: PathBuf, source: DomainError },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,

    /// Route mapping file; the built-in routes are used when unset
    pub routes_file: Option<PathBuf>,

    /// Idle lifetime of a session's draft slot
    pub draft_ttl: Duration,

    /// Period of the notification delivery sweep
    pub delivery_interval: Duration,

    /// Refuse a commit when a requested seat is already occupied
    pub reject_seat_conflicts: bool,

    /// Booking closing time shown in availability text
    pub closing_time: ClockTime,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through a variable lookup function.
    ///
    /// Unset and empty variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_var(
            "BUS_BIND_ADDR",
            get("BUS_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
        )?;
        let routes_file = get("BUS_ROUTES_FILE").map(PathBuf::from);
        let draft_ttl = Duration::from_secs(parse_var(
            "BUS_DRAFT_TTL_SECS",
            get("BUS_DRAFT_TTL_SECS").unwrap_or_else(|| "3600".into()),
        )?);
        let delivery_interval = Duration::from_secs(parse_var(
            "BUS_DELIVERY_INTERVAL_SECS",
            get("BUS_DELIVERY_INTERVAL_SECS").unwrap_or_else(|| "30".into()),
        )?);
        if delivery_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "BUS_DELIVERY_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }
        let reject_seat_conflicts = parse_bool(
            "BUS_REJECT_SEAT_CONFLICTS",
            get("BUS_REJECT_SEAT_CONFLICTS").unwrap_or_else(|| "true".into()),
        )?;

        let closing = get("BUS_BOOKING_CLOSING_TIME").unwrap_or_else(|| "18:00".into());
        let closing_time = ClockTime::parse_hhmm(closing.trim()).map_err(|e| {
            ConfigError::InvalidValue {
                var: "BUS_BOOKING_CLOSING_TIME",
                value: closing.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            bind_addr,
            routes_file,
            draft_ttl,
            delivery_interval,
            reject_seat_conflicts,
            closing_time,
        })
    }

    /// Load the route topology this configuration names.
    pub fn load_topology(&self) -> Result<Topology, ConfigError> {
        match &self.routes_file {
            Some(path) => load_routes(path),
            None => Ok(Topology::builtin()),
        }
    }
}

/// Load a route mapping file.
pub fn load_routes(path: &Path) -> Result<Topology, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::RoutesFile {
        path: path.to_path_buf(),
        source,
    })?;
    Topology::from_json(&json).map_err(|source| ConfigError::Routes {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_var<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
        value,
    })
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value,
            reason: "expected true or false".into(),
        }),
    }
}
