//! Distance/ETA providers.
//!
//! A [`RoutingProvider`] answers point-to-point travel times and orders a
//! set of stops into a trip. Implementations must be safe to share between
//! the concurrent per-team trip optimisations of one cycle.

pub mod fallback;
pub mod local_search;
pub mod osrm;
pub mod retry;
pub mod road_network;
pub mod straight_line;

use crate::config::{ProviderKind, RoutingConfig};
use crate::error::{DispatchError, Result};
use crate::models::{Coordinate, Meters, Seconds, VictimId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub use self::fallback::EtaFallbackProvider;
pub use self::osrm::OsrmProvider;
pub use self::retry::{RetryPolicy, RetryingProvider};
pub use self::road_network::RoadNetworkProvider;
pub use self::straight_line::StraightLineProvider;

/// Travel distance and duration of a single leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub distance_m: Meters,
    pub duration_secs: Seconds,
}

/// A stop to be ordered, carrying its urgency penalty
#[derive(Debug, Clone, PartialEq)]
pub struct TripStop {
    pub victim_id: VictimId,
    pub coordinate: Coordinate,
    pub penalty_secs: Seconds,
}

/// Stops to order for one team, anchored at its depot
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    pub depot: Coordinate,
    pub stops: Vec<TripStop>,
    pub round_trip: bool,
}

impl TripRequest {
    pub fn validate(&self) -> Result<()> {
        if self.stops.is_empty() {
            return Err(DispatchError::InvalidInput("trip has no stops".to_string()));
        }
        self.depot.validate()?;
        for stop in &self.stops {
            stop.coordinate.validate()?;
            if !stop.penalty_secs.is_finite() || stop.penalty_secs < 0.0 {
                return Err(DispatchError::InvalidInput(format!(
                    "stop {} has invalid penalty {}",
                    stop.victim_id, stop.penalty_secs
                )));
            }
        }
        Ok(())
    }

    /// Depot followed by every stop, the coordinate order sent to providers
    pub fn coordinates(&self) -> Vec<Coordinate> {
        std::iter::once(self.depot)
            .chain(self.stops.iter().map(|s| s.coordinate))
            .collect()
    }
}

/// Visiting order returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct TripPlan {
    /// Indices into `TripRequest::stops`, in visiting order
    pub order: Vec<usize>,
    pub distance_m: Meters,
    pub duration_secs: Seconds,
    /// Leg durations in visiting order, starting at the depot
    pub legs: Vec<Seconds>,
    pub geometry: Option<Vec<[f64; 2]>>,
}

impl TripPlan {
    /// A plan must visit every requested stop exactly once
    pub fn check_complete(&self, request: &TripRequest) -> Result<()> {
        let n = request.stops.len();
        let unique: HashSet<usize> = self.order.iter().copied().collect();
        if self.order.len() != n || unique.len() != n || self.order.iter().any(|&i| i >= n) {
            return Err(DispatchError::RoutingUnavailable(format!(
                "partial trip: {} of {} stops ordered",
                unique.iter().filter(|&&i| i < n).count(),
                n
            )));
        }
        Ok(())
    }
}

pub trait RoutingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Travel time between two points
    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds>;

    /// Orders the request's stops into a trip starting at its depot
    fn trip(&self, request: &TripRequest) -> Result<TripPlan>;
}

impl<P: RoutingProvider + ?Sized> RoutingProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
        (**self).eta(from, to)
    }

    fn trip(&self, request: &TripRequest) -> Result<TripPlan> {
        (**self).trip(request)
    }
}

impl<P: RoutingProvider + ?Sized> RoutingProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
        (**self).eta(from, to)
    }

    fn trip(&self, request: &TripRequest) -> Result<TripPlan> {
        (**self).trip(request)
    }
}

/// Builds the provider stack described by the routing config
pub fn build_provider(config: &RoutingConfig) -> Result<Arc<dyn RoutingProvider>> {
    let straight_line = StraightLineProvider::new(config.speed_mps());
    let policy = RetryPolicy::new(config.max_retries, config.backoff());

    let provider: Arc<dyn RoutingProvider> = match config.provider {
        ProviderKind::Osrm => {
            let osrm = OsrmProvider::new(&config.osrm_url, &config.profile, config.timeout())?;
            let retrying = RetryingProvider::new(osrm, policy);
            if config.straight_line_fallback {
                Arc::new(EtaFallbackProvider::new(retrying, straight_line))
            } else {
                Arc::new(retrying)
            }
        }
        ProviderKind::StraightLine => Arc::new(straight_line),
        ProviderKind::RoadNetwork => {
            let (vertices, edges) = match (&config.road_vertices, &config.road_edges) {
                (Some(v), Some(e)) => (v, e),
                _ => {
                    return Err(DispatchError::Config(
                        "road_network provider needs road_vertices and road_edges".to_string(),
                    ))
                }
            };
            let network = RoadNetworkProvider::from_files(vertices, edges, config.speed_mps())?;
            if config.straight_line_fallback {
                Arc::new(EtaFallbackProvider::new(network, straight_line))
            } else {
                Arc::new(network)
            }
        }
    };

    info!(
        provider = %provider.name(),
        straight_line_fallback = config.straight_line_fallback,
        "routing_provider_ready"
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(n: usize) -> TripRequest {
        TripRequest {
            depot: Coordinate::new(0.0, 0.0),
            stops: (0..n)
                .map(|i| TripStop {
                    victim_id: format!("v{}", i),
                    coordinate: Coordinate::new(0.0, i as f64 + 1.0),
                    penalty_secs: 3600.0,
                })
                .collect(),
            round_trip: true,
        }
    }

    fn plan(order: Vec<usize>) -> TripPlan {
        TripPlan {
            order,
            distance_m: 0.0,
            duration_secs: 0.0,
            legs: vec![],
            geometry: None,
        }
    }

    #[test]
    fn test_empty_request_is_invalid() {
        assert!(matches!(
            request(0).validate(),
            Err(DispatchError::InvalidInput(_))
        ));
        assert!(request(2).validate().is_ok());
    }

    #[test]
    fn test_negative_penalty_is_invalid() {
        let mut req = request(1);
        req.stops[0].penalty_secs = -5.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_coordinates_start_at_depot() {
        let coords = request(2).coordinates();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0], Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn test_partial_plan_is_unavailable() {
        let req = request(3);
        assert!(plan(vec![2, 0, 1]).check_complete(&req).is_ok());
        assert!(matches!(
            plan(vec![2, 0]).check_complete(&req),
            Err(DispatchError::RoutingUnavailable(_))
        ));
        assert!(plan(vec![0, 0, 1]).check_complete(&req).is_err());
        assert!(plan(vec![0, 1, 3]).check_complete(&req).is_err());
    }

    #[test]
    fn test_build_straight_line_provider() {
        let config = RoutingConfig {
            provider: ProviderKind::StraightLine,
            ..RoutingConfig::default()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "straight_line");
    }
}
