// Integration tests for the reference dispatch scenarios
use rescue_dispatch::models::{Coordinate, RescueTeam, Seconds, Severity, Victim};
use rescue_dispatch::routing::{
    RetryPolicy, RetryingProvider, RoutingProvider, StraightLineProvider, TripPlan, TripRequest,
};
use rescue_dispatch::{
    CancellationToken, DispatchConfig, DispatchError, DispatchSnapshot, Dispatcher, Result,
};
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn snapshot(victims: Vec<Victim>, teams: Vec<RescueTeam>) -> DispatchSnapshot {
    DispatchSnapshot::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), victims, teams)
}

fn dispatcher<P: RoutingProvider + 'static>(provider: P) -> Dispatcher {
    Dispatcher::from_config(&DispatchConfig::default(), Arc::new(provider)).unwrap()
}

/// Times out on every call it is configured to fail
struct TimingOut {
    eta_calls: AtomicU32,
    trip_calls: AtomicU32,
    fail_eta: bool,
    inner: StraightLineProvider,
}

impl TimingOut {
    fn new(fail_eta: bool) -> Self {
        Self {
            eta_calls: AtomicU32::new(0),
            trip_calls: AtomicU32::new(0),
            fail_eta,
            inner: StraightLineProvider::new(10.0),
        }
    }
}

impl RoutingProvider for TimingOut {
    fn name(&self) -> &str {
        "timing_out"
    }

    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
        self.eta_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_eta {
            return Err(DispatchError::RoutingUnavailable("request timed out".into()));
        }
        self.inner.eta(from, to)
    }

    fn trip(&self, _request: &TripRequest) -> Result<TripPlan> {
        self.trip_calls.fetch_add(1, Ordering::SeqCst);
        Err(DispatchError::RoutingUnavailable("request timed out".into()))
    }
}

#[test]
fn test_scenario_a_critical_visited_first() {
    let snap = snapshot(
        vec![
            Victim::new("stable", Coordinate::new(0.0, 5.0), Severity::Stable),
            Victim::new("critical", Coordinate::new(0.0, 1.0), Severity::Critical),
        ],
        vec![RescueTeam::new("team", Coordinate::new(0.0, 0.0), 3)],
    );

    let result = dispatcher(StraightLineProvider::new(10.0))
        .run_cycle(&snap, &CancellationToken::new())
        .unwrap();

    assert!(result.unserved.is_empty());
    let route = &result.routes["team"];
    assert!(!route.degraded);
    assert_eq!(route.trip.victim_order(), vec!["critical", "stable"]);
    assert_eq!(route.trip.stops.len(), 3);
}

#[test]
fn test_scenario_b_capacity_leaves_least_urgent_unserved() {
    let snap = snapshot(
        vec![
            Victim::new("v-stable", Coordinate::new(0.0, 0.001), Severity::Stable),
            Victim::new("v-critical", Coordinate::new(0.0, 0.03), Severity::Critical),
            Victim::new("v-urgent", Coordinate::new(0.02, 0.0), Severity::Urgent),
        ],
        vec![
            RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 1),
            RescueTeam::new("t2", Coordinate::new(0.01, 0.01), 1),
        ],
    );

    let result = dispatcher(StraightLineProvider::new(10.0))
        .run_cycle(&snap, &CancellationToken::new())
        .unwrap();

    assert_eq!(result.assigned_count(), 2);
    assert_eq!(result.unserved, vec!["v-stable".to_string()]);
    for route in result.routes.values() {
        assert_eq!(route.trip.victim_count(), 1);
    }
}

#[test]
fn test_scenario_c_assignment_fails_on_timeouts() {
    let provider = Arc::new(RetryingProvider::new(
        TimingOut::new(true),
        RetryPolicy::new(1, Duration::from_millis(1)),
    ));
    let dispatcher =
        Dispatcher::from_config(&DispatchConfig::default(), provider.clone()).unwrap();
    let snap = snapshot(
        vec![Victim::new("v1", Coordinate::new(0.0, 0.01), Severity::Critical)],
        vec![RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 1)],
    );

    let result = dispatcher.run_cycle(&snap, &CancellationToken::new());

    assert!(matches!(result, Err(DispatchError::RoutingUnavailable(_))));
    // One attempt plus one retry
    assert_eq!(provider.inner().eta_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scenario_c_trip_degrades_on_timeouts() {
    let provider = Arc::new(RetryingProvider::new(
        TimingOut::new(false),
        RetryPolicy::new(1, Duration::from_millis(1)),
    ));
    let dispatcher =
        Dispatcher::from_config(&DispatchConfig::default(), provider.clone()).unwrap();
    let snap = snapshot(
        vec![
            Victim::new("stable", Coordinate::new(0.0, 0.001), Severity::Stable),
            Victim::new("critical", Coordinate::new(0.0, 0.02), Severity::Critical),
        ],
        vec![RescueTeam::new("t1", Coordinate::new(0.0, 0.0), 2)],
    );

    let result = dispatcher.run_cycle(&snap, &CancellationToken::new()).unwrap();

    assert_eq!(provider.inner().trip_calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.degraded_teams(), vec!["t1"]);
    let route = &result.routes["t1"];
    assert_eq!(route.trip.victim_order(), vec!["critical", "stable"]);

    let geojson = route.trip.to_geojson(route.degraded);
    assert_eq!(geojson["features"][0]["properties"]["degraded"], true);
}

#[test]
fn test_no_teams_reports_everyone_unserved() {
    let snap = snapshot(
        vec![
            Victim::new("a", Coordinate::new(0.0, 0.01), Severity::Urgent),
            Victim::new("b", Coordinate::new(0.0, 0.02), Severity::Critical),
        ],
        vec![],
    );

    let result = dispatcher(TimingOut::new(true))
        .run_cycle(&snap, &CancellationToken::new())
        .unwrap();

    assert!(result.routes.is_empty());
    assert_eq!(result.unserved, vec!["b".to_string(), "a".to_string()]);
}
