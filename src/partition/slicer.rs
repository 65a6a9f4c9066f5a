//! Date-range slicing
//!
//! Splits a datetime range into fixed-size slices, optionally skipping
//! ranges that previous syncs already covered.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Datetime-based slicer
///
/// Each slice is a `{start_field: .., end_field: ..}` object whose
/// boundaries are rendered with `format`.
#[derive(Debug, Clone)]
pub struct DatetimeSlicer {
    /// Start datetime
    start: DateTime<Utc>,
    /// End datetime
    end: DateTime<Utc>,
    /// Step duration
    step: Duration,
    /// Format string for datetime output
    format: String,
    /// Slice field holding the lower boundary
    start_field: String,
    /// Slice field holding the upper boundary
    end_field: String,
    /// Re-read window applied to the resume point
    lookback: Option<Duration>,
}

impl DatetimeSlicer {
    /// Create a new datetime slicer
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
        format: impl Into<String>,
        start_field: impl Into<String>,
        end_field: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            step,
            format: format.into(),
            start_field: start_field.into(),
            end_field: end_field.into(),
            lookback: None,
        }
    }

    /// Create from string values
    pub fn from_strings(
        start: &str,
        end: &str,
        step: &str,
        format: impl Into<String>,
        start_field: impl Into<String>,
        end_field: impl Into<String>,
    ) -> Result<Self> {
        let start_dt = parse_datetime(start)?;
        let end_dt = if end == "now" {
            Utc::now()
        } else {
            parse_datetime(end)?
        };
        let step_dur = parse_duration(step)?;

        Ok(Self::new(
            start_dt,
            end_dt,
            step_dur,
            format,
            start_field,
            end_field,
        ))
    }

    /// Re-read `lookback` before the point a previous sync stopped at
    #[must_use]
    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = Some(lookback);
        self
    }

    /// Field names of the lower and upper boundaries
    pub fn boundary_fields(&self) -> (&str, &str) {
        (&self.start_field, &self.end_field)
    }

    /// Every slice between start and end
    pub fn slices(&self) -> Result<Vec<JsonObject>> {
        self.split(self.start, self.end)
    }

    /// Slices covering what `synced` does not.
    ///
    /// Gaps between synced ranges are sliced as-is; the range after the last
    /// synced end is widened backwards by the lookback window.
    pub fn slices_excluding(
        &self,
        synced: &[(DateTime<Utc>, DateTime<Utc>)],
    ) -> Result<Vec<JsonObject>> {
        let mut covered: Vec<_> = synced.to_vec();
        covered.sort();

        let mut slices = Vec::new();
        let mut position = self.start;
        for (lower, upper) in covered {
            if lower > position {
                slices.extend(self.split(position, lower.min(self.end))?);
            }
            position = position.max(upper);
        }

        let resume = match self.lookback {
            Some(lookback) if position > self.start => (position - lookback).max(self.start),
            _ => position,
        };
        slices.extend(self.split(resume, self.end)?);
        Ok(slices)
    }

    fn split(&self, lower: DateTime<Utc>, upper: DateTime<Utc>) -> Result<Vec<JsonObject>> {
        if self.step <= Duration::zero() {
            return Err(Error::config(format!(
                "Slice step must be positive, got {}",
                self.step
            )));
        }

        let mut slices = Vec::new();
        let mut current = lower;
        while current < upper {
            let next = (current + self.step).min(upper);

            let mut slice = JsonObject::new();
            slice.insert(
                self.start_field.clone(),
                JsonValue::String(self.format_datetime(current)),
            );
            slice.insert(
                self.end_field.clone(),
                JsonValue::String(self.format_datetime(next)),
            );
            slices.push(slice);

            current = next;
        }
        Ok(slices)
    }

    /// Format a datetime using the configured format
    fn format_datetime(&self, dt: DateTime<Utc>) -> String {
        dt.format(&self.format).to_string()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a datetime string into UTC DateTime
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    // Try RFC 3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%Y/%m/%d",
    ];

    for fmt in formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(ndt) = nd.and_hms_opt(0, 0, 0) {
                return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
            }
        }
    }

    Err(Error::config(format!("Invalid datetime format: {s}")))
}

/// Parse a duration string like "1d", "2h", "30m"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    let (num_str, suffix) = if let Some(stripped) = s.strip_suffix('d') {
        (stripped, 'd')
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 'h')
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 'm')
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 's')
    } else if let Some(stripped) = s.strip_suffix('w') {
        (stripped, 'w')
    } else {
        // Days if no suffix
        (s, 'd')
    };

    let num: i64 = num_str
        .parse()
        .map_err(|_| Error::config(format!("Invalid duration number: {num_str}")))?;

    let duration = match suffix {
        'w' => Duration::weeks(num),
        'd' => Duration::days(num),
        'h' => Duration::hours(num),
        'm' => Duration::minutes(num),
        's' => Duration::seconds(num),
        _ => return Err(Error::config(format!("Invalid duration suffix: {suffix}"))),
    };

    Ok(duration)
}
