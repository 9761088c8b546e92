//! Engine error types
//!
//! The engine is a deterministic single-pass batch computation: nothing is
//! retried, and every failure aborts the run. Callers are expected to
//! validate date ranges before invoking the pipeline.

use chrono::{DateTime, Utc};

/// Errors produced by the detection/tracking engine
#[derive(Debug, Clone)]
pub enum TrackError {
    /// Requested date lies outside the available sample range
    Range {
        /// The offending date
        requested: DateTime<Utc>,
        /// First available sample date
        first: DateTime<Utc>,
        /// Last available sample date
        last: DateTime<Utc>,
    },
    /// A programming invariant was violated (stencil cross-check mismatch,
    /// multiple successors after linking, overlapping tracks)
    Consistency(String),
    /// An unrecognized mode or out-of-range member index was requested
    Configuration(String),
    /// A track position could not be matched to a grid coordinate
    Lookup(String),
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::Range {
                requested,
                first,
                last,
            } => write!(
                f,
                "Date {requested} is out of the available range {first}..={last}"
            ),
            TrackError::Consistency(msg) => write!(f, "Consistency violation: {msg}"),
            TrackError::Configuration(msg) => write!(f, "Invalid configuration: {msg}"),
            TrackError::Lookup(msg) => write!(f, "Grid lookup failed: {msg}"),
        }
    }
}

impl std::error::Error for TrackError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_error_message_names_bounds() {
        let first = Utc.with_ymd_and_hms(2005, 6, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2005, 11, 30, 18, 0, 0).unwrap();
        let err = TrackError::Range {
            requested: Utc.with_ymd_and_hms(2006, 1, 1, 0, 0, 0).unwrap(),
            first,
            last,
        };
        let msg = err.to_string();
        assert!(msg.contains("2006"), "message should name the bad date: {msg}");
        assert!(msg.contains("2005-06-01"), "message should name the range: {msg}");
    }
}
