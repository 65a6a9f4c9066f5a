//! Interval-list state types

use crate::types::JsonObject;
use serde::{Deserialize, Serialize};

/// Tag identifying the concurrency-compatible state format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StateType {
    /// List of synced ranges
    #[default]
    #[serde(rename = "date-range")]
    DateRange,
}

impl StateType {
    /// Wire tag
    pub fn as_str(self) -> &'static str {
        match self {
            StateType::DateRange => "date-range",
        }
    }
}

/// A closed-open range of the cursor domain that has been synced
#[derive(Debug, Clone, PartialEq)]
pub struct Interval<V> {
    /// Lower boundary
    pub start: V,
    /// Upper boundary
    pub end: V,
    /// Highest cursor value observed in the range, if tracked
    pub most_recent_cursor_value: Option<V>,
    /// Partition identifier fields; intervals only merge within one partition
    pub partition: JsonObject,
}

impl<V: Ord + Clone> Interval<V> {
    /// Create an interval outside any partition
    pub fn new(start: V, end: V) -> Self {
        Self {
            start,
            end,
            most_recent_cursor_value: None,
            partition: JsonObject::new(),
        }
    }

    /// Attach the most recent cursor value
    #[must_use]
    pub fn with_most_recent(mut self, value: Option<V>) -> Self {
        self.most_recent_cursor_value = value;
        self
    }

    /// Attach partition identifier fields
    #[must_use]
    pub fn with_partition(mut self, partition: JsonObject) -> Self {
        self.partition = partition;
        self
    }

    /// The same interval with its bounds in ascending order
    #[must_use]
    pub fn ordered(mut self) -> Self {
        if self.end < self.start {
            std::mem::swap(&mut self.start, &mut self.end);
        }
        self
    }

    /// Extend this interval to also cover `other`
    pub fn absorb(&mut self, other: Interval<V>) {
        if other.end > self.end {
            self.end = other.end;
        }
        if other.most_recent_cursor_value > self.most_recent_cursor_value {
            self.most_recent_cursor_value = other.most_recent_cursor_value;
        }
    }
}

/// Concurrency-compatible state of one stream
#[derive(Debug, Clone, PartialEq)]
pub struct ConcurrentState<V> {
    /// Format tag
    pub state_type: StateType,
    /// Synced intervals
    pub slices: Vec<Interval<V>>,
    /// The legacy state this was converted from, kept verbatim
    pub legacy: JsonObject,
}

impl<V> Default for ConcurrentState<V> {
    fn default() -> Self {
        Self {
            state_type: StateType::DateRange,
            slices: Vec::new(),
            legacy: JsonObject::new(),
        }
    }
}

impl<V: Ord + Clone> ConcurrentState<V> {
    /// Create a state holding the given intervals
    pub fn new(slices: Vec<Interval<V>>) -> Self {
        Self {
            slices,
            ..Self::default()
        }
    }

    /// Highest interval end
    pub fn max_end(&self) -> Option<&V> {
        self.slices.iter().map(|s| &s.end).max()
    }
}
