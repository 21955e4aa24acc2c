// Per-team trip ordering with a degraded fallback
//
// Urgency reaches the provider only as per-stop penalties. When the provider
// cannot produce a complete trip, stops are ordered nearest-urgency-first
// from straight-line estimates and the route is flagged as degraded.

use crate::algorithms::weights::WeightPolicy;
use crate::error::{DispatchError, Result};
use crate::models::{RescueTeam, Stop, TeamRoute, Trip, Victim};
use crate::routing::{RoutingProvider, StraightLineProvider, TripPlan, TripRequest, TripStop};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TripOptimizer {
    weights: WeightPolicy,
    round_trip: bool,
    estimator: StraightLineProvider,
}

impl TripOptimizer {
    pub fn new(weights: WeightPolicy, round_trip: bool, estimator: StraightLineProvider) -> Self {
        Self {
            weights,
            round_trip,
            estimator,
        }
    }

    /// Stops anchored at the team's position, each carrying its routing weight
    pub fn build_request(&self, team: &RescueTeam, victims: &[&Victim]) -> Result<TripRequest> {
        let stops = victims
            .iter()
            .map(|v| -> Result<TripStop> {
                Ok(TripStop {
                    victim_id: v.id.clone(),
                    coordinate: v.coordinate,
                    penalty_secs: self.weights.weight(v.urgency())?,
                })
            })
            .collect::<Result<Vec<TripStop>>>()?;

        let request = TripRequest {
            depot: team.position,
            stops,
            round_trip: self.round_trip,
        };
        request.validate()?;
        Ok(request)
    }

    /// Orders one team's victims. Only `RoutingUnavailable` degrades;
    /// every other error is returned to the caller.
    pub fn optimize(
        &self,
        team: &RescueTeam,
        victims: &[&Victim],
        provider: &dyn RoutingProvider,
    ) -> Result<TeamRoute> {
        let request = self.build_request(team, victims)?;

        let outcome = provider.trip(&request).and_then(|plan| {
            plan.check_complete(&request)?;
            Ok(plan)
        });

        match outcome {
            Ok(plan) => {
                debug!(
                    team_id = %team.id,
                    stops = request.stops.len(),
                    duration_secs = plan.duration_secs,
                    "trip_optimized"
                );
                Ok(TeamRoute {
                    trip: assemble_trip(&team.id, &request, &plan),
                    degraded: false,
                })
            }
            Err(DispatchError::RoutingUnavailable(reason)) => {
                warn!(
                    team_id = %team.id,
                    provider = %provider.name(),
                    reason = %reason,
                    "trip_degraded"
                );
                let plan = self.degraded_plan(&request)?;
                Ok(TeamRoute {
                    trip: assemble_trip(&team.id, &request, &plan),
                    degraded: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Nearest-urgency-first plan with straight-line distances and durations
    pub fn degraded_plan(&self, request: &TripRequest) -> Result<TripPlan> {
        let order = self.degraded_order(request)?;

        let mut path: Vec<_> = std::iter::once(request.depot)
            .chain(order.iter().map(|&i| request.stops[i].coordinate))
            .collect();
        if request.round_trip {
            path.push(request.depot);
        }

        let mut distance_m = 0.0;
        let mut legs = Vec::with_capacity(path.len());
        for pair in path.windows(2) {
            let leg = self.estimator.leg(pair[0], pair[1])?;
            distance_m += leg.distance_m;
            legs.push(leg.duration_secs);
        }

        Ok(TripPlan {
            order,
            distance_m,
            duration_secs: legs.iter().sum(),
            legs,
            geometry: None,
        })
    }

    /// Lowest weight first; among equal weights the stop with the shortest
    /// straight-line ETA from the previous stop, then the lowest victim id
    pub fn degraded_order(&self, request: &TripRequest) -> Result<Vec<usize>> {
        let mut remaining: Vec<usize> = (0..request.stops.len()).collect();
        let mut order = Vec::with_capacity(remaining.len());
        let mut current = request.depot;

        while !remaining.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (pos, &i) in remaining.iter().enumerate() {
                let eta = self.estimator.eta(current, request.stops[i].coordinate)?;
                let better = match best {
                    None => true,
                    Some((best_pos, best_eta)) => {
                        let a = &request.stops[i];
                        let b = &request.stops[remaining[best_pos]];
                        a.penalty_secs
                            .total_cmp(&b.penalty_secs)
                            .then(eta.total_cmp(&best_eta))
                            .then(a.victim_id.cmp(&b.victim_id))
                            .is_lt()
                    }
                };
                if better {
                    best = Some((pos, eta));
                }
            }

            if let Some((pos, _)) = best {
                let i = remaining.remove(pos);
                current = request.stops[i].coordinate;
                order.push(i);
            }
        }

        Ok(order)
    }
}

fn assemble_trip(team_id: &str, request: &TripRequest, plan: &TripPlan) -> Trip {
    let stops = std::iter::once(Stop::Depot {
        coordinate: request.depot,
    })
    .chain(plan.order.iter().map(|&i| {
        let stop = &request.stops[i];
        Stop::Victim {
            victim_id: stop.victim_id.clone(),
            coordinate: stop.coordinate,
            penalty_secs: stop.penalty_secs,
        }
    }))
    .collect();

    Trip {
        team_id: team_id.to_string(),
        stops,
        returns_to_depot: request.round_trip,
        distance_m: plan.distance_m,
        duration_secs: plan.duration_secs,
        geometry: plan.geometry.clone(),
    }
}
