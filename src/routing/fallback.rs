// Straight-line ETA substitution when the primary provider is down

use crate::error::{DispatchError, Result};
use crate::models::{Coordinate, Seconds};
use crate::routing::{RoutingProvider, StraightLineProvider, TripPlan, TripRequest};
use tracing::warn;

/// Answers ETAs from the fallback when the primary is unavailable.
///
/// Trips are always delegated to the primary; the trip optimizer owns the
/// degraded ordering for trips.
#[derive(Debug)]
pub struct EtaFallbackProvider<P> {
    primary: P,
    fallback: StraightLineProvider,
}

impl<P: RoutingProvider> EtaFallbackProvider<P> {
    pub fn new(primary: P, fallback: StraightLineProvider) -> Self {
        Self { primary, fallback }
    }
}

impl<P: RoutingProvider> RoutingProvider for EtaFallbackProvider<P> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
        match self.primary.eta(from, to) {
            Err(DispatchError::RoutingUnavailable(reason)) => {
                warn!(
                    provider = %self.primary.name(),
                    reason = %reason,
                    "eta_straight_line_fallback"
                );
                self.fallback.eta(from, to)
            }
            other => other,
        }
    }

    fn trip(&self, request: &TripRequest) -> Result<TripPlan> {
        self.primary.trip(request)
    }
}
