//! Partition contracts
//!
//! A stream is read as a set of independent partitions (e.g. one per date
//! slice). Each partition produces a finite, non-restartable stream of
//! records; a [`PartitionGenerator`] produces the partitions themselves.
//!
//! # Overview
//!
//! - `Record` - a unit of extracted data plus its stream identity
//! - `Partition` - an independently readable slice of the source
//! - `PartitionGenerator` - lazily produces the partitions for a sync mode
//! - `DatetimeSlicer` - builds date-range slice descriptors

mod slicer;
mod types;

pub use slicer::{parse_datetime, parse_duration, DatetimeSlicer};
pub use types::{
    slice_key, Partition, PartitionGenerator, PartitionKey, PartitionStream, Record,
    RecordStream,
};
