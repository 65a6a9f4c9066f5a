//! State converters
//!
//! Stateless policies translating between a legacy scalar cursor value and
//! the concurrency-compatible list of synced intervals.
//!
//! Two wire formats are understood:
//!
//! ```text
//! concurrent: {"state_type": "date-range", "slices": [{"start": v, "end": v, ...}], "legacy": {...}}
//! legacy:     {<cursor_field>: v}
//! ```

mod converter;
mod datetime;
mod types;

pub use converter::{StateConverter, END_KEY, MOST_RECENT_RECORD_KEY, START_KEY};
pub use datetime::{DateTimeStateConverter, EpochValueConverter, IsoMillisConverter};
pub use types::{ConcurrentState, Interval, StateType};
