//! Availability check adapters between the legacy and concurrent contracts

use super::types::LegacyStream;
use crate::engine::{AvailabilityStrategy, StreamAvailability};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Runs a legacy stream's availability check as a concurrent strategy
pub struct StreamAvailabilityStrategy {
    stream: Arc<dyn LegacyStream>,
}

impl StreamAvailabilityStrategy {
    /// Wrap the check of `stream`
    pub fn new(stream: Arc<dyn LegacyStream>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl AvailabilityStrategy for StreamAvailabilityStrategy {
    async fn check_availability(&self) -> StreamAvailability {
        match self.stream.check_availability().await {
            (true, _) => StreamAvailability::Available,
            (false, message) => StreamAvailability::Unavailable { message },
        }
    }
}

impl fmt::Debug for StreamAvailabilityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamAvailabilityStrategy")
            .field("stream", &self.stream.name())
            .finish()
    }
}

/// Exposes a concurrent strategy through the legacy `(available, reason)` form
#[derive(Debug, Clone)]
pub struct AvailabilityStrategyFacade {
    strategy: Arc<dyn AvailabilityStrategy>,
}

impl AvailabilityStrategyFacade {
    /// Wrap `strategy`
    pub fn new(strategy: Arc<dyn AvailabilityStrategy>) -> Self {
        Self { strategy }
    }

    /// Run the check
    pub async fn check_availability(&self) -> (bool, Option<String>) {
        match self.strategy.check_availability().await {
            StreamAvailability::Available => (true, None),
            StreamAvailability::Unavailable { message } => (false, message),
        }
    }
}
