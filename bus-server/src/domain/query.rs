//! Validated search queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{DomainError, Topology};

/// A traveler's search: origin, destination and travel date.
///
/// Stop names are stored in their canonical spelling, so downstream code
/// never has to care how the traveler capitalized them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
}

impl SearchQuery {
    /// Validate raw search input against the topology.
    ///
    /// # Examples
    ///
    /// ```
    /// use bus_server::domain::{SearchQuery, Topology};
    ///
    /// let topology = Topology::builtin();
    /// let q = SearchQuery::parse(&topology, "jaffna", "COLOMBO", "2025-07-01").unwrap();
    /// assert_eq!(q.from, "Jaffna");
    /// assert_eq!(q.to, "Colombo");
    ///
    /// assert!(SearchQuery::parse(&topology, "Kandy", "Colombo", "2025-07-01").is_err());
    /// ```
    pub fn parse(
        topology: &Topology,
        from: &str,
        to: &str,
        date: &str,
    ) -> Result<Self, DomainError> {
        let from = topology
            .canonical_stop(from)
            .ok_or_else(|| DomainError::UnknownStop(from.trim().to_string()))?;
        let to = topology
            .canonical_stop(to)
            .ok_or_else(|| DomainError::UnknownStop(to.trim().to_string()))?;

        if from == to {
            return Err(DomainError::SameStops);
        }

        let date = parse_date(date)?;

        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            date,
        })
    }
}

/// Parse a "YYYY-MM-DD" travel date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_names() {
        let topology = Topology::builtin();
        let q = SearchQuery::parse(&topology, " negombo", "killinochchi ", "2025-07-01").unwrap();
        assert_eq!(q.from, "Negombo");
        assert_eq!(q.to, "Killinochchi");
        assert_eq!(q.date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }

    #[test]
    fn rejects_unknown_and_equal_stops() {
        let topology = Topology::builtin();
        assert_eq!(
            SearchQuery::parse(&topology, "Galle", "Colombo", "2025-07-01").unwrap_err(),
            DomainError::UnknownStop("Galle".into())
        );
        assert_eq!(
            SearchQuery::parse(&topology, "Colombo", "colombo", "2025-07-01").unwrap_err(),
            DomainError::SameStops
        );
    }

    #[test]
    fn rejects_bad_dates() {
        let topology = Topology::builtin();
        for bad in ["", "2025-13-01", "01-07-2025", "2025/07/01", "2025-02-30"] {
            assert!(
                matches!(
                    SearchQuery::parse(&topology, "Jaffna", "Colombo", bad),
                    Err(DomainError::InvalidDate(_))
                ),
                "{bad} should be rejected"
            );
        }
    }
}
