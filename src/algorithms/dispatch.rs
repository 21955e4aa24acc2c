// Dispatch cycle orchestration
//
// snapshot -> time windows -> assignment -> per-team trips -> cycle result.
// Nothing is written back to the store unless the whole cycle succeeds.

use crate::algorithms::assignment::GreedyAssigner;
use crate::algorithms::time_window::DeadlineTable;
use crate::algorithms::trip_optimizer::TripOptimizer;
use crate::algorithms::weights::WeightPolicy;
use crate::algorithms::AssignmentSolver;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::models::{
    CycleResult, DispatchSnapshot, RescueStatus, RescueTeam, StatusPatch, TeamId, TeamRoute, Victim,
};
use crate::routing::{RoutingProvider, StraightLineProvider};
use crate::store::VictimStore;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared flag that abandons an in-flight cycle
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DispatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct Dispatcher {
    deadlines: DeadlineTable,
    optimizer: TripOptimizer,
    provider: Arc<dyn RoutingProvider>,
    assigner: Box<dyn AssignmentSolver>,
}

impl Dispatcher {
    pub fn new(
        deadlines: DeadlineTable,
        optimizer: TripOptimizer,
        provider: Arc<dyn RoutingProvider>,
    ) -> Self {
        Self {
            deadlines,
            optimizer,
            provider,
            assigner: Box::new(GreedyAssigner::new()),
        }
    }

    pub fn from_config(config: &DispatchConfig, provider: Arc<dyn RoutingProvider>) -> Result<Self> {
        config.validate()?;
        let weights = WeightPolicy::try_from(&config.weights)?;
        let deadlines = DeadlineTable::try_from(&config.deadlines)?;
        let estimator = StraightLineProvider::new(config.routing.speed_mps());

        Ok(Self::new(
            deadlines,
            TripOptimizer::new(weights, config.trip.round_trip, estimator),
            provider,
        ))
    }

    /// Swap in a different assignment strategy
    pub fn with_assigner(mut self, assigner: Box<dyn AssignmentSolver>) -> Self {
        self.assigner = assigner;
        self
    }

    /// Runs one full cycle over an immutable snapshot.
    ///
    /// The cycle timestamp is the snapshot time, so identical snapshots
    /// produce identical results.
    pub fn run_cycle(
        &self,
        snapshot: &DispatchSnapshot,
        cancel: &CancellationToken,
    ) -> Result<CycleResult> {
        let started = Instant::now();
        snapshot.validate()?;

        let victims: Vec<&Victim> = snapshot.active_victims().collect();
        info!(
            victims = victims.len(),
            teams = snapshot.teams.len(),
            provider = %self.provider.name(),
            assigner = %self.assigner.name(),
            "cycle_started"
        );

        cancel.check()?;
        let outcome = self.assigner.assign(
            &victims,
            &snapshot.teams,
            &self.deadlines,
            snapshot.taken_at,
            self.provider.as_ref(),
        )?;
        cancel.check()?;

        let by_id: HashMap<&str, &Victim> = victims.iter().map(|v| (v.id.as_str(), *v)).collect();
        let teams: HashMap<&str, &RescueTeam> =
            snapshot.teams.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut work: Vec<(&RescueTeam, Vec<&Victim>)> = Vec::with_capacity(outcome.assignments.len());
        for (team_id, victim_ids) in &outcome.assignments {
            let team = teams.get(team_id.as_str()).copied().ok_or_else(|| {
                DispatchError::InvalidInput(format!("assignment names unknown team {}", team_id))
            })?;
            let assigned = victim_ids
                .iter()
                .map(|id| {
                    by_id.get(id.as_str()).copied().ok_or_else(|| {
                        DispatchError::InvalidInput(format!("assignment names unknown victim {}", id))
                    })
                })
                .collect::<Result<Vec<&Victim>>>()?;
            work.push((team, assigned));
        }

        let routes: Vec<(TeamId, TeamRoute)> = work
            .par_iter()
            .map(|(team, assigned)| -> Result<(TeamId, TeamRoute)> {
                cancel.check()?;
                let route = self.optimizer.optimize(team, assigned, self.provider.as_ref())?;
                Ok((team.id.clone(), route))
            })
            .collect::<Result<Vec<_>>>()?;

        cancel.check()?;

        let result = CycleResult {
            cycle_timestamp: snapshot.taken_at,
            routes: routes.into_iter().collect::<BTreeMap<_, _>>(),
            unserved: outcome.unserved,
            at_risk: outcome.at_risk,
        };

        info!(
            routes = result.routes.len(),
            assigned = result.assigned_count(),
            unserved = result.unserved.len(),
            at_risk = result.at_risk.len(),
            degraded = result.degraded_teams().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle_completed"
        );
        Ok(result)
    }

    /// Snapshot the store, run a cycle, then write status patches back
    pub fn run_from_store(
        &self,
        store: &dyn VictimStore,
        cancel: &CancellationToken,
    ) -> Result<CycleResult> {
        let snapshot = store.snapshot()?;
        let result = self.run_cycle(&snapshot, cancel)?;
        commit_patches(store, &status_patches(&snapshot, &result));
        Ok(result)
    }
}

/// One patch per dispatched victim: assigned ones move to `assigned`,
/// unserved ones stay `pending`
pub fn status_patches(snapshot: &DispatchSnapshot, result: &CycleResult) -> Vec<StatusPatch> {
    let by_id: HashMap<&str, &Victim> = snapshot
        .active_victims()
        .map(|v| (v.id.as_str(), v))
        .collect();

    let assigned = result
        .routes
        .values()
        .flat_map(|route| route.trip.victim_order())
        .map(|id| (id, RescueStatus::Assigned));
    let unserved = result
        .unserved
        .iter()
        .map(|id| (id.as_str(), RescueStatus::Pending));

    assigned
        .chain(unserved)
        .filter_map(|(id, rescue_status)| {
            by_id.get(id).map(|victim| StatusPatch {
                victim_id: victim.id.clone(),
                rescue_status,
                emergency_status: victim.severity,
                last_updated: result.cycle_timestamp,
            })
        })
        .collect()
}

/// Store writes are fire-and-forget; failures are logged only
pub fn commit_patches(store: &dyn VictimStore, patches: &[StatusPatch]) {
    let mut failed = 0;
    for patch in patches {
        if let Err(e) = store.patch_status(patch) {
            failed += 1;
            warn!(victim_id = %patch.victim_id, error = %e, "status_patch_failed");
        }
    }
    info!(patches = patches.len(), failed, "status_patches_committed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::assignment::AssignmentOutcome;
    use crate::models::{Coordinate, Seconds, Severity};
    use crate::routing::{TripPlan, TripRequest};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn dispatcher(provider: Arc<dyn RoutingProvider>) -> Dispatcher {
        Dispatcher::from_config(&DispatchConfig::default(), provider).unwrap()
    }

    fn snapshot() -> DispatchSnapshot {
        DispatchSnapshot::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            vec![
                Victim::new("v1", Coordinate::new(0.0, 0.01), Severity::Critical),
                Victim::new("v2", Coordinate::new(0.0, 0.02), Severity::Stable),
                Victim::new("v3", Coordinate::new(0.01, 0.0), Severity::Urgent),
            ],
            vec![RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 2)],
        )
    }

    /// Cancels the shared token the first time a trip is requested
    struct CancelOnTrip {
        inner: StraightLineProvider,
        token: CancellationToken,
    }

    impl RoutingProvider for CancelOnTrip {
        fn name(&self) -> &str {
            "cancel_on_trip"
        }

        fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
            self.inner.eta(from, to)
        }

        fn trip(&self, request: &TripRequest) -> Result<TripPlan> {
            self.token.cancel();
            self.inner.trip(request)
        }
    }

    #[test]
    fn test_cycle_uses_snapshot_time() {
        let snap = snapshot();
        let result = dispatcher(Arc::new(StraightLineProvider::new(10.0)))
            .run_cycle(&snap, &CancellationToken::new())
            .unwrap();

        assert_eq!(result.cycle_timestamp, snap.taken_at);
        assert_eq!(result.assigned_count(), 2);
        assert_eq!(result.unserved, vec!["v2".to_string()]);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = dispatcher(Arc::new(StraightLineProvider::new(10.0))).run_cycle(&snapshot(), &token);
        assert_eq!(result, Err(DispatchError::Cancelled));
    }

    #[test]
    fn test_cancel_during_trips_emits_nothing() {
        let token = CancellationToken::new();
        let provider = CancelOnTrip {
            inner: StraightLineProvider::new(10.0),
            token: token.clone(),
        };
        let store = MemoryStore::new(snapshot());

        let result = dispatcher(Arc::new(provider)).run_from_store(&store, &token);
        assert_eq!(result, Err(DispatchError::Cancelled));
        assert!(store.patches().is_empty());
    }

    /// Leaves every victim unserved
    struct NoAssignments;

    impl AssignmentSolver for NoAssignments {
        fn name(&self) -> &str {
            "none"
        }

        fn assign(
            &self,
            victims: &[&Victim],
            _teams: &[RescueTeam],
            _deadlines: &DeadlineTable,
            _now: chrono::DateTime<Utc>,
            _provider: &dyn RoutingProvider,
        ) -> Result<AssignmentOutcome> {
            Ok(AssignmentOutcome {
                assignments: BTreeMap::new(),
                unserved: victims.iter().map(|v| v.id.clone()).collect(),
                at_risk: vec![],
            })
        }
    }

    #[test]
    fn test_custom_assigner_is_used() {
        let result = dispatcher(Arc::new(StraightLineProvider::new(10.0)))
            .with_assigner(Box::new(NoAssignments))
            .run_cycle(&snapshot(), &CancellationToken::new())
            .unwrap();

        assert!(result.routes.is_empty());
        assert_eq!(result.unserved.len(), 3);
    }

    #[test]
    fn test_patches_follow_result() {
        let store = MemoryStore::new(snapshot());
        let result = dispatcher(Arc::new(StraightLineProvider::new(10.0)))
            .run_from_store(&store, &CancellationToken::new())
            .unwrap();

        let patches = store.patches();
        assert_eq!(patches.len(), 3);
        for patch in &patches {
            let expected = if result.team_for(&patch.victim_id).is_some() {
                RescueStatus::Assigned
            } else {
                RescueStatus::Pending
            };
            assert_eq!(patch.rescue_status, expected);
            assert_eq!(patch.last_updated, result.cycle_timestamp);
        }
    }
}
