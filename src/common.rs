use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct RepoIdentifier {
    pub owner: String,
    pub repo: String,
}

impl RepoIdentifier {
    pub fn new<O, R>(owner: O, repo: R) -> Self
    where
        O: Into<String>,
        R: Into<String>,
    {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A closed interval of instants, both ends included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Builds a window out of two ISO-8601 timestamps. Timestamps without an offset are read as
    /// UTC, and bare dates as midnight UTC.
    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidTimestampError> {
        Ok(Self::new(parse_timestamp(start)?, parse_timestamp(end)?))
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, InvalidTimestampError> {
    let input = input.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(timestamp.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|timestamp| timestamp.and_utc())
        .ok_or_else(|| InvalidTimestampError(input.to_string()))
}

#[derive(Error, Debug, PartialEq)]
#[error("invalid timestamp: {0}")]
pub struct InvalidTimestampError(String);
