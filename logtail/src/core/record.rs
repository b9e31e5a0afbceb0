//! Log record format and the end-of-log sentinel.

use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeDelta, Utc};

/// Final line of every completed deployment log.
///
/// Records always start with a timestamp, so this can never collide with one.
pub const SENTINEL: &str = "--- end of deployment log ---";

/// Synthetic identity attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub gender: String,
    pub phone: String,
}

/// One line of a deployment log.
///
/// Renders as `<RFC3339 nanos>: Name: <name> Gender: <gender> Phone: <phone>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub persona: Persona,
}

impl LogRecord {
    pub fn new(timestamp: DateTime<Utc>, persona: Persona) -> Self {
        Self { timestamp, persona }
    }

    /// Record text followed by the line terminator, ready to append.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Name: {} Gender: {} Phone: {}",
            format_timestamp(self.timestamp),
            self.persona.name,
            self.persona.gender,
            self.persona.phone
        )
    }
}

/// RFC 3339 with up to nine fractional digits, trailing zeros dropped
/// (`2024-03-01T12:30:00.12Z`, or `2024-03-01T12:30:00Z` on a whole second).
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    let full = timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let Some((seconds, fraction)) = full.split_once('.') else {
        return full;
    };
    let digits = fraction.trim_end_matches('Z').trim_end_matches('0');
    if digits.is_empty() {
        format!("{seconds}Z")
    } else {
        format!("{seconds}.{digits}Z")
    }
}

/// Timestamp for the next record, strictly after `previous`.
///
/// Wall clocks can stall or step backwards; bumping by one nanosecond keeps the
/// log ordered by timestamp.
pub fn next_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + TimeDelta::nanoseconds(1),
        _ => now,
    }
}

/// A complete line read back from a deployment log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Record(String),
    Sentinel,
}

impl LogLine {
    /// Classify a line with its terminator already stripped.
    pub fn classify(line: &str) -> Self {
        if line == SENTINEL {
            Self::Sentinel
        } else {
            Self::Record(line.to_string())
        }
    }
}

/// Extract the timestamp of a rendered record, if the line is well formed.
pub fn parse_record_timestamp(line: &str) -> Option<DateTime<FixedOffset>> {
    let (stamp, rest) = line.split_once(": Name: ")?;
    let (_, rest) = rest.split_once(" Gender: ")?;
    rest.split_once(" Phone: ")?;
    DateTime::parse_from_rfc3339(stamp).ok()
}
