//! Datetime-based converters
//!
//! Both variants use `DateTime<Utc>` as the cursor domain and differ only in
//! wire representation and granularity.

use super::converter::StateConverter;
use crate::error::{Error, Result};
use crate::partition::parse_datetime;
use crate::types::JsonValue;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::fmt;

/// A converter whose domain is UTC timestamps
pub trait DateTimeStateConverter: Send + Sync + fmt::Debug {
    /// Parse a wire timestamp
    fn parse_timestamp(&self, raw: &JsonValue) -> Result<DateTime<Utc>>;

    /// Render a timestamp in its wire form
    fn output_format(&self, timestamp: &DateTime<Utc>) -> JsonValue;

    /// Smallest representable step
    fn granularity(&self) -> Duration;

    /// Whether emitted state uses the legacy scalar form
    fn is_sequential_state(&self) -> bool;

    /// The next representable timestamp, saturating at the end of time
    fn increment(&self, timestamp: &DateTime<Utc>) -> DateTime<Utc> {
        timestamp
            .checked_add_signed(self.granularity())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl<T: DateTimeStateConverter> StateConverter for T {
    type Value = DateTime<Utc>;

    fn parse_value(&self, raw: &JsonValue) -> Result<DateTime<Utc>> {
        self.parse_timestamp(raw)
    }

    fn output_format(&self, value: &DateTime<Utc>) -> JsonValue {
        DateTimeStateConverter::output_format(self, value)
    }

    fn increment(&self, value: &DateTime<Utc>) -> DateTime<Utc> {
        DateTimeStateConverter::increment(self, value)
    }

    fn zero_value(&self) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH
    }

    fn is_sequential_state(&self) -> bool {
        DateTimeStateConverter::is_sequential_state(self)
    }
}

// ============================================================================
// Epoch seconds
// ============================================================================

/// Cursor values are integer seconds since the Unix epoch
#[derive(Debug, Clone, Copy)]
pub struct EpochValueConverter {
    sequential: bool,
}

impl EpochValueConverter {
    /// Converter emitting legacy scalar state
    pub fn new() -> Self {
        Self { sequential: true }
    }

    /// Converter emitting concurrent-format state
    pub fn concurrent() -> Self {
        Self { sequential: false }
    }
}

impl Default for EpochValueConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DateTimeStateConverter for EpochValueConverter {
    fn parse_timestamp(&self, raw: &JsonValue) -> Result<DateTime<Utc>> {
        let seconds = match raw {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::conversion(format!("{raw} is not an epoch timestamp")))?;

        DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| Error::conversion(format!("epoch timestamp {seconds} is out of range")))
    }

    fn output_format(&self, timestamp: &DateTime<Utc>) -> JsonValue {
        JsonValue::from(timestamp.timestamp())
    }

    fn granularity(&self) -> Duration {
        Duration::seconds(1)
    }

    fn is_sequential_state(&self) -> bool {
        self.sequential
    }
}

// ============================================================================
// ISO 8601 with milliseconds
// ============================================================================

/// Cursor values are ISO 8601 strings with millisecond precision,
/// e.g. `2021-01-18T21:18:20.000Z`
#[derive(Debug, Clone, Copy)]
pub struct IsoMillisConverter {
    sequential: bool,
}

impl IsoMillisConverter {
    /// Converter emitting legacy scalar state
    pub fn new() -> Self {
        Self { sequential: true }
    }

    /// Converter emitting concurrent-format state
    pub fn concurrent() -> Self {
        Self { sequential: false }
    }
}

impl Default for IsoMillisConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DateTimeStateConverter for IsoMillisConverter {
    fn parse_timestamp(&self, raw: &JsonValue) -> Result<DateTime<Utc>> {
        let text = raw
            .as_str()
            .ok_or_else(|| Error::conversion(format!("{raw} is not an ISO 8601 string")))?;
        parse_datetime(text).map_err(|_| Error::conversion(format!("cannot parse `{text}` as ISO 8601")))
    }

    fn output_format(&self, timestamp: &DateTime<Utc>) -> JsonValue {
        JsonValue::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn granularity(&self) -> Duration {
        Duration::milliseconds(1)
    }

    fn is_sequential_state(&self) -> bool {
        self.sequential
    }
}
