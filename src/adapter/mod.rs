//! Legacy stream adapters
//!
//! Bridges streams written against the single-threaded, slice-based
//! contract to the concurrent engine, and back.
//!
//! # Overview
//!
//! - `LegacyStream` - the slice-based contract connectors implement
//! - `StreamPartition` / `StreamPartitionGenerator` - one partition per slice
//! - `StreamAvailabilityStrategy` / `AvailabilityStrategyFacade` - availability checks in either direction
//! - `StreamFacade` - a `LegacyStream` whose reads run on the concurrent engine

mod availability;
mod facade;
mod partition;
mod types;

pub use availability::{AvailabilityStrategyFacade, StreamAvailabilityStrategy};
pub use facade::StreamFacade;
pub use partition::{StreamPartition, StreamPartitionGenerator};
pub use types::{LegacyStream, SliceStream, StreamData, StreamDataStream};

#[cfg(test)]
mod tests;
