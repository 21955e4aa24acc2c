// Stop ordering for providers that solve trips locally
//
// Cost of a visiting order = total travel duration + urgency-weighted latency.
// Each stop's arrival time is scaled by (largest penalty / its penalty), so a
// stop with half the penalty costs twice as much per second of waiting.

use crate::error::Result;
use crate::models::{Coordinate, Seconds};
use crate::routing::{Leg, TripPlan, TripRequest};

/// Above this many stops the exhaustive search gives way to greedy + swaps
pub const EXHAUSTIVE_LIMIT: usize = 7;

const MAX_SWAP_PASSES: usize = 50;

/// Pairwise leg matrix over [depot, stop 0, stop 1, ...]
struct LegMatrix {
    legs: Vec<Vec<Leg>>,
}

impl LegMatrix {
    fn build<F>(points: &[Coordinate], leg: &F) -> Result<Self>
    where
        F: Fn(Coordinate, Coordinate) -> Result<Leg>,
    {
        let mut legs = Vec::with_capacity(points.len());
        for from in points {
            let mut row = Vec::with_capacity(points.len());
            for to in points {
                if from == to {
                    row.push(Leg {
                        distance_m: 0.0,
                        duration_secs: 0.0,
                    });
                } else {
                    row.push(leg(*from, *to)?);
                }
            }
            legs.push(row);
        }
        Ok(Self { legs })
    }

    fn get(&self, from: usize, to: usize) -> Leg {
        self.legs[from][to]
    }
}

struct Search<'a> {
    matrix: &'a LegMatrix,
    factors: Vec<f64>,
    round_trip: bool,
}

impl Search<'_> {
    /// Objective for an order of stop indices (matrix index = stop index + 1)
    fn cost(&self, order: &[usize]) -> f64 {
        let mut elapsed = 0.0;
        let mut latency = 0.0;
        let mut prev = 0;
        for &stop in order {
            elapsed += self.matrix.get(prev, stop + 1).duration_secs;
            latency += elapsed * self.factors[stop];
            prev = stop + 1;
        }
        if self.round_trip {
            elapsed += self.matrix.get(prev, 0).duration_secs;
        }
        elapsed + latency
    }

    fn exhaustive(&self, n: usize) -> Vec<usize> {
        let mut best_order = Vec::new();
        let mut best_cost = f64::INFINITY;

        for perm in generate_permutations((0..n).collect()) {
            let cost = self.cost(&perm);
            if cost < best_cost {
                best_cost = cost;
                best_order = perm;
            }
        }

        best_order
    }

    /// Nearest-stop construction where urgent stops look closer
    fn greedy(&self, n: usize) -> Vec<usize> {
        let mut remaining: Vec<usize> = (0..n).collect();
        let mut order = Vec::with_capacity(n);
        let mut current = 0;

        while !remaining.is_empty() {
            let (pos, _) = remaining
                .iter()
                .enumerate()
                .map(|(pos, &stop)| {
                    let scaled = self.matrix.get(current, stop + 1).duration_secs / self.factors[stop];
                    (pos, scaled)
                })
                .fold((0, f64::INFINITY), |best, candidate| {
                    if candidate.1 < best.1 {
                        candidate
                    } else {
                        best
                    }
                });
            let stop = remaining.remove(pos);
            order.push(stop);
            current = stop + 1;
        }

        order
    }

    /// Swap stop pairs while any swap lowers the cost
    fn improve(&self, mut order: Vec<usize>) -> Vec<usize> {
        let mut best_cost = self.cost(&order);

        for _ in 0..MAX_SWAP_PASSES {
            let mut improved = false;
            for i in 0..order.len() {
                for j in (i + 1)..order.len() {
                    order.swap(i, j);
                    let cost = self.cost(&order);
                    if cost < best_cost {
                        best_cost = cost;
                        improved = true;
                    } else {
                        order.swap(i, j);
                    }
                }
            }
            if !improved {
                break;
            }
        }

        order
    }
}

/// Generate all permutations of the given stop indices
fn generate_permutations(stops: Vec<usize>) -> Vec<Vec<usize>> {
    if stops.is_empty() {
        return vec![vec![]];
    }

    let mut result = Vec::new();

    for (i, &stop) in stops.iter().enumerate() {
        let mut remaining = stops.clone();
        remaining.remove(i);

        for mut perm in generate_permutations(remaining) {
            perm.insert(0, stop);
            result.push(perm);
        }
    }

    result
}

/// Urgency multipliers relative to the least urgent stop
fn urgency_factors(request: &TripRequest) -> Vec<f64> {
    let floor = |p: Seconds| p.max(1.0);
    let reference = request
        .stops
        .iter()
        .map(|s| floor(s.penalty_secs))
        .fold(1.0, f64::max);
    request
        .stops
        .iter()
        .map(|s| reference / floor(s.penalty_secs))
        .collect()
}

/// Orders the request's stops using the given leg estimator
pub fn solve_trip<F>(request: &TripRequest, leg: F) -> Result<TripPlan>
where
    F: Fn(Coordinate, Coordinate) -> Result<Leg>,
{
    request.validate()?;

    let points = request.coordinates();
    let matrix = LegMatrix::build(&points, &leg)?;
    let n = request.stops.len();
    let search = Search {
        matrix: &matrix,
        factors: urgency_factors(request),
        round_trip: request.round_trip,
    };

    let order = if n <= EXHAUSTIVE_LIMIT {
        search.exhaustive(n)
    } else {
        search.improve(search.greedy(n))
    };

    Ok(plan_from_order(&matrix, order, request.round_trip))
}

fn plan_from_order(matrix: &LegMatrix, order: Vec<usize>, round_trip: bool) -> TripPlan {
    let mut path: Vec<usize> = std::iter::once(0).chain(order.iter().map(|s| s + 1)).collect();
    if round_trip {
        path.push(0);
    }

    let legs: Vec<Leg> = path.windows(2).map(|w| matrix.get(w[0], w[1])).collect();

    TripPlan {
        order,
        distance_m: legs.iter().map(|l| l.distance_m).sum(),
        duration_secs: legs.iter().map(|l| l.duration_secs).sum(),
        legs: legs.iter().map(|l| l.duration_secs).collect(),
        geometry: None,
    }
}
