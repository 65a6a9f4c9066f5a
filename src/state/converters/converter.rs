//! The converter contract
//!
//! Concrete converters only define the domain (`parse_value`,
//! `output_format`, `increment`, `zero_value`); the conversion and merge
//! logic shared by every domain lives in the provided methods.

use super::types::{ConcurrentState, Interval, StateType};
use crate::cursor::CursorField;
use crate::error::{Error, Result};
use crate::partition::slice_key;
use crate::types::{JsonObject, JsonValue};
use std::fmt;

/// Interval lower boundary key
pub const START_KEY: &str = "start";
/// Interval upper boundary key
pub const END_KEY: &str = "end";
/// Key of the most recent cursor value observed in an interval
pub const MOST_RECENT_RECORD_KEY: &str = "most_recent_cursor_value";

const STATE_TYPE_KEY: &str = "state_type";
const SLICES_KEY: &str = "slices";
const LEGACY_KEY: &str = "legacy";

/// Translates cursor state between its legacy and concurrent forms
pub trait StateConverter: Send + Sync + fmt::Debug {
    /// The ordered cursor domain
    type Value: Ord + Clone + Send + Sync + fmt::Debug + 'static;

    /// Parse a wire value into the domain
    fn parse_value(&self, raw: &JsonValue) -> Result<Self::Value>;

    /// Render a domain value in its wire form
    fn output_format(&self, value: &Self::Value) -> JsonValue;

    /// The smallest value strictly greater than `value`
    fn increment(&self, value: &Self::Value) -> Self::Value;

    /// The minimum of the domain, used when no prior state exists
    fn zero_value(&self) -> Self::Value;

    /// Whether emitted state uses the legacy scalar form
    fn is_sequential_state(&self) -> bool {
        true
    }

    /// Whether `state` is already in the concurrent format
    fn is_state_message_compatible(&self, state: &JsonValue) -> bool {
        state.get(STATE_TYPE_KEY).and_then(JsonValue::as_str) == Some(StateType::DateRange.as_str())
    }

    /// Reduce `intervals` to a minimal covering set.
    ///
    /// Intervals are grouped by partition and sorted by start; an interval
    /// absorbs into its predecessor when `increment(prev.end) >= next.start`.
    /// Inverted intervals are reordered first. The result is sorted and
    /// merging it again is a no-op.
    fn merge_intervals(&self, intervals: Vec<Interval<Self::Value>>) -> Vec<Interval<Self::Value>> {
        let mut intervals: Vec<Interval<Self::Value>> =
            intervals.into_iter().map(Interval::ordered).collect();
        intervals.sort_by_cached_key(|i| (slice_key(Some(&i.partition)), i.start.clone(), i.end.clone()));

        let mut merged: Vec<Interval<Self::Value>> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            if let Some(last) = merged.last_mut() {
                if last.partition == interval.partition && self.increment(&last.end) >= interval.start {
                    last.absorb(interval);
                    continue;
                }
            }
            merged.push(interval);
        }
        merged
    }

    /// Parse a concurrent-format state
    fn deserialize(&self, state: &JsonValue) -> Result<ConcurrentState<Self::Value>> {
        if !self.is_state_message_compatible(state) {
            return Err(Error::conversion(format!(
                "expected `{STATE_TYPE_KEY}: {}` in {state}",
                StateType::DateRange.as_str()
            )));
        }

        let mut slices = Vec::new();
        for raw in state
            .get(SLICES_KEY)
            .and_then(JsonValue::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            slices.push(self.deserialize_interval(raw)?);
        }

        let legacy = state
            .get(LEGACY_KEY)
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(ConcurrentState {
            state_type: StateType::DateRange,
            slices,
            legacy,
        })
    }

    /// Parse one wire interval
    fn deserialize_interval(&self, raw: &JsonValue) -> Result<Interval<Self::Value>> {
        let object = raw
            .as_object()
            .ok_or_else(|| Error::conversion(format!("interval must be an object, got {raw}")))?;
        let boundary = |key: &str| {
            object
                .get(key)
                .ok_or_else(|| Error::conversion(format!("interval {raw} has no `{key}`")))
                .and_then(|v| self.parse_value(v))
        };

        let most_recent = match object.get(MOST_RECENT_RECORD_KEY) {
            Some(JsonValue::Null) | None => None,
            Some(value) => Some(self.parse_value(value)?),
        };
        let partition: JsonObject = object
            .iter()
            .filter(|(k, _)| ![START_KEY, END_KEY, MOST_RECENT_RECORD_KEY].contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Interval::new(boundary(START_KEY)?, boundary(END_KEY)?)
            .with_most_recent(most_recent)
            .with_partition(partition))
    }

    /// Render a state in the concurrent wire format
    fn serialize(&self, state: &ConcurrentState<Self::Value>) -> JsonValue {
        let slices = state
            .slices
            .iter()
            .map(|interval| {
                let mut object = interval.partition.clone();
                object.insert(START_KEY.to_string(), self.output_format(&interval.start));
                object.insert(END_KEY.to_string(), self.output_format(&interval.end));
                if let Some(most_recent) = &interval.most_recent_cursor_value {
                    object.insert(MOST_RECENT_RECORD_KEY.to_string(), self.output_format(most_recent));
                }
                JsonValue::Object(object)
            })
            .collect();

        let mut object = JsonObject::new();
        object.insert(
            STATE_TYPE_KEY.to_string(),
            JsonValue::String(state.state_type.as_str().to_string()),
        );
        object.insert(SLICES_KEY.to_string(), JsonValue::Array(slices));
        if !state.legacy.is_empty() {
            object.insert(LEGACY_KEY.to_string(), JsonValue::Object(state.legacy.clone()));
        }
        JsonValue::Object(object)
    }

    /// Convert a legacy scalar state into the concurrent form.
    ///
    /// Concurrent-format input passes through. Otherwise the result is a
    /// single interval ending at the legacy low-water mark (or at `start`,
    /// or the zero value), with the input kept under `legacy`.
    fn convert_from_sequential_state(
        &self,
        cursor_field: &CursorField,
        state: &JsonValue,
        start: Option<Self::Value>,
    ) -> Result<ConcurrentState<Self::Value>> {
        if self.is_state_message_compatible(state) {
            return self.deserialize(state);
        }

        let legacy = match state {
            JsonValue::Object(object) => object.clone(),
            JsonValue::Null => JsonObject::new(),
            other => {
                return Err(Error::conversion(format!(
                    "legacy state must be an object, got {other}"
                )))
            }
        };

        let low_water_mark = match legacy.get(cursor_field.key()) {
            Some(raw) if !raw.is_null() => self.parse_value(raw)?,
            _ => start.clone().unwrap_or_else(|| self.zero_value()),
        };
        let interval_start = start
            .unwrap_or_else(|| low_water_mark.clone())
            .min(low_water_mark.clone());

        Ok(ConcurrentState {
            state_type: StateType::DateRange,
            slices: vec![Interval::new(interval_start, low_water_mark)],
            legacy,
        })
    }

    /// Convert a concurrent state back to `{cursor_field: max end}`,
    /// keeping any other legacy keys
    fn convert_to_sequential_state(
        &self,
        cursor_field: &CursorField,
        state: &ConcurrentState<Self::Value>,
    ) -> JsonValue {
        let mut legacy = state.legacy.clone();
        if let Some(end) = state.max_end() {
            legacy.insert(cursor_field.key().to_string(), self.output_format(end));
        }
        JsonValue::Object(legacy)
    }

    /// The state a checkpoint should carry
    fn convert_to_state_message(
        &self,
        cursor_field: &CursorField,
        state: &ConcurrentState<Self::Value>,
    ) -> JsonValue {
        if self.is_sequential_state() {
            self.convert_to_sequential_state(cursor_field, state)
        } else {
            self.serialize(state)
        }
    }
}
