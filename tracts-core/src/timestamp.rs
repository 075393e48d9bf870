//! # Timestamps
//!
//! Date-time values carried by records. A [`Timestamp`] is either naive (no offset
//! information) or zoned with a fixed UTC offset, and is rendered in the classic
//! `isoformat` shape: fractional seconds only when non-zero, offsets as `+HH:MM`.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid ISO-8601 date-time '{0}'")]
pub struct TimestampParseError(pub String);

impl Timestamp {
    /// Parses `YYYY-MM-DDTHH:MM:SS[.fraction][Z|±HH:MM]`.
    ///
    /// Text with an offset is read as RFC 3339, anything else as a naive date-time. The
    /// date/time separator and the `Z` designator are accepted in either case. Seconds
    /// are mandatory and a fraction needs at least one digit.
    pub fn parse_iso8601(text: &str) -> Result<Self, TimestampParseError> {
        parse(text).ok_or_else(|| TimestampParseError(text.to_string()))
    }

    /// Interprets milliseconds since the Unix epoch as a naive UTC date-time.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|dt| Timestamp::Naive(dt.naive_utc()))
    }

    /// Milliseconds since the Unix epoch. Naive values are taken to be UTC.
    pub fn to_millis(&self) -> i64 {
        match self {
            Timestamp::Naive(naive) => naive.and_utc().timestamp_millis(),
            Timestamp::Zoned(zoned) => zoned.timestamp_millis(),
        }
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Timestamp::Naive(_) => None,
            Timestamp::Zoned(zoned) => Some(*zoned.offset()),
        }
    }

    /// The wall-clock reading, ignoring any offset.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Timestamp::Naive(naive) => *naive,
            Timestamp::Zoned(zoned) => zoned.naive_local(),
        }
    }

    pub fn to_iso8601(&self) -> String {
        let mut out = format_naive(&self.naive_local());
        if let Some(offset) = self.offset() {
            out.push_str(&format_offset(offset));
        }
        out
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl FromStr for Timestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timestamp::parse_iso8601(s)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::Naive(value)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Timestamp::Zoned(value)
    }
}

pub(crate) fn format_naive(naive: &NaiveDateTime) -> String {
    format!(
        "{}T{}",
        naive.date().format("%Y-%m-%d"),
        format_time(&naive.time())
    )
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_time(time: &NaiveTime) -> String {
    let micros = time.nanosecond() / 1_000;
    if micros == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        format!("{}.{micros:06}", time.format("%H:%M:%S"))
    }
}

fn format_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dt%H:%M:%S%.f"];

fn parse(text: &str) -> Option<Timestamp> {
    if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
        return Some(Timestamp::Zoned(zoned));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(Timestamp::Naive)
}
