// Greedy deadline-first assignment of victims to rescue teams

use crate::algorithms::time_window::{DeadlineTable, TimeWindow};
use crate::algorithms::AssignmentSolver;
use crate::error::{DispatchError, Result};
use crate::models::{Coordinate, RescueTeam, Seconds, TeamId, Victim, VictimId};
use crate::routing::RoutingProvider;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Result of one assignment pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentOutcome {
    /// Victims per team, in the order they were assigned
    pub assignments: BTreeMap<TeamId, Vec<VictimId>>,

    /// Victims left over once every team was full
    pub unserved: Vec<VictimId>,

    /// Assigned victims whose direct ETA already exceeds their deadline
    pub at_risk: Vec<VictimId>,
}

impl AssignmentOutcome {
    pub fn assigned_count(&self) -> usize {
        self.assignments.values().map(Vec::len).sum()
    }

    pub fn team_for(&self, victim_id: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(_, victims)| victims.iter().any(|v| v == victim_id))
            .map(|(team_id, _)| team_id.as_str())
    }
}

/// Single pass in deadline order; each victim goes to the closest team that
/// still has room. Ties on ETA go to the lowest team id.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyAssigner;

impl GreedyAssigner {
    pub fn new() -> Self {
        Self
    }
}

struct TeamSlot<'a> {
    team: &'a RescueTeam,
    remaining: u32,
}

fn checked_eta(provider: &dyn RoutingProvider, from: Coordinate, to: Coordinate) -> Result<Seconds> {
    let eta = provider.eta(from, to)?;
    if !eta.is_finite() || eta < 0.0 {
        return Err(DispatchError::RoutingUnavailable(format!(
            "{} returned unusable eta {}",
            provider.name(),
            eta
        )));
    }
    Ok(eta)
}

impl AssignmentSolver for GreedyAssigner {
    fn name(&self) -> &str {
        "greedy"
    }

    fn assign(
        &self,
        victims: &[&Victim],
        teams: &[RescueTeam],
        deadlines: &DeadlineTable,
        now: DateTime<Utc>,
        provider: &dyn RoutingProvider,
    ) -> Result<AssignmentOutcome> {
        let mut queue: Vec<(TimeWindow, &Victim)> = victims
            .iter()
            .map(|v| deadlines.time_window(v.urgency(), now).map(|w| (w, *v)))
            .collect::<Result<_>>()?;
        queue.sort_by(|(wa, a), (wb, b)| {
            wa.due_by
                .cmp(&wb.due_by)
                .then(a.urgency().cmp(&b.urgency()))
                .then(a.id.cmp(&b.id))
        });

        let mut slots: Vec<TeamSlot> = teams
            .iter()
            .map(|team| TeamSlot {
                team,
                remaining: team.capacity,
            })
            .collect();
        slots.sort_by(|a, b| a.team.id.cmp(&b.team.id));

        let mut outcome = AssignmentOutcome::default();

        for (window, victim) in queue {
            let mut best: Option<(usize, Seconds)> = None;
            for (index, slot) in slots.iter().enumerate() {
                if slot.remaining == 0 {
                    continue;
                }
                let eta = checked_eta(provider, slot.team.position, victim.coordinate)?;
                // Slots are sorted by id, so strict < keeps the lowest id on ties
                if best.map_or(true, |(_, best_eta)| eta < best_eta) {
                    best = Some((index, eta));
                }
            }

            let Some((index, eta)) = best else {
                debug!(victim_id = %victim.id, "victim_unserved");
                outcome.unserved.push(victim.id.clone());
                continue;
            };

            let slot = &mut slots[index];
            slot.remaining -= 1;
            outcome
                .assignments
                .entry(slot.team.id.clone())
                .or_default()
                .push(victim.id.clone());

            let on_time = Duration::try_from_secs_f64(eta)
                .map(|eta| window.admits(eta))
                .unwrap_or(false);
            if !on_time {
                outcome.at_risk.push(victim.id.clone());
            }

            debug!(
                victim_id = %victim.id,
                team_id = %slot.team.id,
                eta_secs = eta,
                on_time,
                "victim_assigned"
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::routing::{StraightLineProvider, TripPlan, TripRequest};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn provider() -> StraightLineProvider {
        StraightLineProvider::new(10.0)
    }

    fn victim(id: &str, lat: f64, lon: f64, severity: Severity) -> Victim {
        Victim::new(id, Coordinate::new(lat, lon), severity)
    }

    fn run(victims: &[Victim], teams: &[RescueTeam], provider: &dyn RoutingProvider) -> Result<AssignmentOutcome> {
        let refs: Vec<&Victim> = victims.iter().collect();
        GreedyAssigner::new().assign(&refs, teams, &DeadlineTable::default(), now(), provider)
    }

    #[test]
    fn test_closest_team_wins() {
        let teams = vec![
            RescueTeam::new("north", Coordinate::new(0.1, 0.0), 2),
            RescueTeam::new("south", Coordinate::new(-0.1, 0.0), 2),
        ];
        let victims = vec![victim("v1", 0.09, 0.0, Severity::Urgent)];

        let outcome = run(&victims, &teams, &provider()).unwrap();
        assert_eq!(outcome.team_for("v1"), Some("north"));
        assert!(outcome.unserved.is_empty());
    }

    #[test]
    fn test_eta_tie_goes_to_lowest_team_id() {
        let teams = vec![
            RescueTeam::new("t2", Coordinate::new(0.0, 0.1), 1),
            RescueTeam::new("t1", Coordinate::new(0.0, -0.1), 1),
        ];
        let victims = vec![victim("v1", 0.0, 0.0, Severity::Stable)];

        let outcome = run(&victims, &teams, &provider()).unwrap();
        assert_eq!(outcome.team_for("v1"), Some("t1"));
    }

    #[test]
    fn test_most_urgent_served_first_when_capacity_runs_out() {
        let teams = vec![RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 1)];
        let victims = vec![
            victim("near_stable", 0.0, 0.001, Severity::Stable),
            victim("far_critical", 0.0, 0.05, Severity::Critical),
        ];

        let outcome = run(&victims, &teams, &provider()).unwrap();
        assert_eq!(outcome.assignments["t1"], vec!["far_critical".to_string()]);
        assert_eq!(outcome.unserved, vec!["near_stable".to_string()]);
    }

    #[test]
    fn test_equal_deadlines_break_ties_by_id() {
        let teams = vec![RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 1)];
        let victims = vec![
            victim("b", 0.0, 0.001, Severity::Urgent),
            victim("a", 0.0, 0.002, Severity::Urgent),
        ];

        let outcome = run(&victims, &teams, &provider()).unwrap();
        assert_eq!(outcome.team_for("a"), Some("t1"));
        assert_eq!(outcome.unserved, vec!["b".to_string()]);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let teams = vec![
            RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 2),
            RescueTeam::new("t2", Coordinate::new(0.0, 1.0), 0),
        ];
        let victims: Vec<Victim> = (0..5)
            .map(|i| victim(&format!("v{}", i), 0.0, 0.01 * i as f64, Severity::Urgent))
            .collect();

        let outcome = run(&victims, &teams, &provider()).unwrap();
        assert_eq!(outcome.assignments["t1"].len(), 2);
        assert!(!outcome.assignments.contains_key("t2"));
        assert_eq!(outcome.unserved.len(), 3);
    }

    #[test]
    fn test_slow_arrival_is_at_risk() {
        // About 111 km at 10 m/s is over three hours, past the critical deadline
        let teams = vec![RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 2)];
        let victims = vec![
            victim("far", 1.0, 0.0, Severity::Critical),
            victim("near", 0.0, 0.01, Severity::Critical),
        ];

        let outcome = run(&victims, &teams, &provider()).unwrap();
        assert_eq!(outcome.at_risk, vec!["far".to_string()]);
        assert_eq!(outcome.assigned_count(), 2);
    }

    struct Unreachable {
        calls: AtomicU32,
    }

    impl RoutingProvider for Unreachable {
        fn name(&self) -> &str {
            "unreachable"
        }

        fn eta(&self, _from: Coordinate, _to: Coordinate) -> Result<Seconds> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DispatchError::RoutingUnavailable("timeout".into()))
        }

        fn trip(&self, _request: &TripRequest) -> Result<TripPlan> {
            Err(DispatchError::RoutingUnavailable("timeout".into()))
        }
    }

    #[test]
    fn test_routing_failure_is_fatal() {
        let unreachable = Unreachable {
            calls: AtomicU32::new(0),
        };
        let teams = vec![RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 1)];
        let victims = vec![victim("v1", 0.0, 0.01, Severity::Critical)];

        assert!(matches!(
            run(&victims, &teams, &unreachable),
            Err(DispatchError::RoutingUnavailable(_))
        ));
    }

    #[test]
    fn test_no_eta_calls_without_capacity() {
        let unreachable = Unreachable {
            calls: AtomicU32::new(0),
        };
        let victims = vec![victim("v1", 0.0, 0.01, Severity::Critical)];

        let outcome = run(&victims, &[], &unreachable).unwrap();
        assert_eq!(outcome.unserved, vec!["v1".to_string()]);
        assert_eq!(unreachable.calls.load(Ordering::SeqCst), 0);
    }
}
