// Great-circle travel estimates at a constant speed

use crate::error::{DispatchError, Result};
use crate::models::{Coordinate, Seconds};
use crate::routing::local_search::solve_trip;
use crate::routing::{Leg, RoutingProvider, TripPlan, TripRequest};

/// Haversine distance divided by a fixed speed. Never unavailable, so it
/// backs demo runs and stands in when the real router is down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightLineProvider {
    speed_mps: f64,
}

impl StraightLineProvider {
    pub fn new(speed_mps: f64) -> Self {
        Self { speed_mps }
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    pub fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg> {
        from.validate()?;
        to.validate()?;
        if !(self.speed_mps.is_finite() && self.speed_mps > 0.0) {
            return Err(DispatchError::InvalidInput(format!(
                "speed must be positive, got {}",
                self.speed_mps
            )));
        }
        let distance_m = from.haversine_distance(&to);
        Ok(Leg {
            distance_m,
            duration_secs: distance_m / self.speed_mps,
        })
    }
}

impl RoutingProvider for StraightLineProvider {
    fn name(&self) -> &str {
        "straight_line"
    }

    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
        Ok(self.leg(from, to)?.duration_secs)
    }

    fn trip(&self, request: &TripRequest) -> Result<TripPlan> {
        let mut plan = solve_trip(request, |from, to| self.leg(from, to))?;
        let mut line: Vec<[f64; 2]> = std::iter::once(request.depot.lon_lat())
            .chain(plan.order.iter().map(|&i| request.stops[i].coordinate.lon_lat()))
            .collect();
        if request.round_trip {
            line.push(request.depot.lon_lat());
        }
        plan.geometry = Some(line);
        Ok(plan)
    }
}
