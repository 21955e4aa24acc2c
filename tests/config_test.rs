// Integration test for loading dispatch configuration from disk
use rescue_dispatch::algorithms::time_window::DeadlineTable;
use rescue_dispatch::config::{DispatchConfig, ProviderKind};
use rescue_dispatch::utils::scenario::ScenarioBuilder;
use rescue_dispatch::{CancellationToken, Dispatcher};
use rescue_dispatch::routing::build_provider;
use rescue_dispatch::DispatchError;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
[weights]
base_penalty = 1800
max_penalty = 5400

[deadlines]
minutes = [30, 60, 120, 240, 480]

[teams]
default_capacity = 6

[trip]
round_trip = false

[routing]
provider = "straight_line"
timeout_ms = 2500
max_retries = 2
backoff_ms = 100
fallback_speed_kmh = 36.0
"#,
    );

    let config = DispatchConfig::load_from_path(file.path()).unwrap();
    assert_eq!(config.weights.base_penalty, 1800.0);
    let deadlines = DeadlineTable::try_from(&config.deadlines).unwrap();
    assert_eq!(deadlines.deadline(1).unwrap(), Duration::from_secs(1800));
    assert_eq!(config.teams.default_capacity, 6);
    assert!(!config.trip.round_trip);
    assert_eq!(config.routing.provider, ProviderKind::StraightLine);
    assert_eq!(config.routing.timeout(), Duration::from_millis(2500));
    assert!((config.routing.speed_mps() - 10.0).abs() < 1e-9);

    let provider = build_provider(&config.routing).unwrap();
    assert_eq!(provider.name(), "straight_line");
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = DispatchConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, DispatchConfig::default());
}

#[test]
fn test_invalid_file_is_rejected() {
    let file = write_config("[weights]\nbase_penalty = \"soon\"\n");
    assert!(matches!(
        DispatchConfig::load_from_path(file.path()),
        Err(DispatchError::Config(_))
    ));

    let file = write_config("[teams]\ndefault_capacity = 0\n");
    assert!(DispatchConfig::load_from_path(file.path()).is_err());
}

#[test]
fn test_osrm_provider_builds_from_defaults() {
    let config = DispatchConfig::default();
    let provider = build_provider(&config.routing).unwrap();
    assert_eq!(provider.name(), "osrm");
}

#[test]
fn test_missing_road_files_fail_at_startup() {
    let file = write_config(
        r#"
[routing]
provider = "road_network"
road_vertices = "/nonexistent/vertices.txt"
road_edges = "/nonexistent/edges.txt"
"#,
    );
    let config = DispatchConfig::load_from_path(file.path()).unwrap();
    assert!(matches!(
        build_provider(&config.routing),
        Err(DispatchError::Config(_))
    ));
}

#[test]
fn test_oversized_deadline_fails_at_startup() {
    let file = write_config("[deadlines]\nminutes = [60, 120, 240, 360, 9223372036854775807]\n");
    assert!(matches!(
        DispatchConfig::load_from_path(file.path()),
        Err(DispatchError::Config(_))
    ));

    // The longest accepted table still runs a full cycle
    let file = write_config("[deadlines]\nminutes = [60, 120, 240, 360, 10080]\n");
    let mut config = DispatchConfig::load_from_path(file.path()).unwrap();
    config.routing.provider = ProviderKind::StraightLine;
    let provider = build_provider(&config.routing).unwrap();
    let dispatcher = Dispatcher::from_config(&config, provider).unwrap();
    let snapshot = ScenarioBuilder::new(10, 2).build();
    let result = dispatcher
        .run_cycle(&snapshot, &CancellationToken::new())
        .unwrap();
    assert_eq!(result.assigned_count() + result.unserved.len(), 10);
}
