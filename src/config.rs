//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. DISPATCH_CONFIG environment variable
//! 3. Default: config/dispatch.toml
//!
//! Every value is validated once at startup; the dispatch stages assume a
//! validated config and do not re-check it.

use crate::error::{DispatchError, Result};
use crate::algorithms::time_window::DeadlineTable;
use crate::models::Seconds;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/dispatch.toml";
pub const CONFIG_ENV_VAR: &str = "DISPATCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeightConfig {
    /// Penalty for the most urgent ordinal, in seconds
    #[serde(default = "default_base_penalty")]
    pub base_penalty: Seconds,
    /// Penalty for the least urgent ordinal, in seconds
    #[serde(default = "default_max_penalty")]
    pub max_penalty: Seconds,
}

fn default_base_penalty() -> Seconds {
    3600.0
}

fn default_max_penalty() -> Seconds {
    7200.0
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            base_penalty: default_base_penalty(),
            max_penalty: default_max_penalty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeadlineConfig {
    /// Rescue deadline per urgency ordinal 1..=5, in minutes
    #[serde(default = "default_deadline_minutes")]
    pub minutes: Vec<u64>,
}

fn default_deadline_minutes() -> Vec<u64> {
    vec![60, 120, 240, 360, 480]
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            minutes: default_deadline_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamConfig {
    /// Capacity for team records that do not carry one
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,
}

fn default_capacity() -> u32 {
    3
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TripConfig {
    #[serde(default = "default_round_trip")]
    pub round_trip: bool,
}

fn default_round_trip() -> bool {
    true
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            round_trip: default_round_trip(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Osrm,
    StraightLine,
    RoadNetwork,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_osrm_url")]
    pub osrm_url: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Per-call timeout for the routing service
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Substitute straight-line ETAs when the provider cannot answer
    #[serde(default)]
    pub straight_line_fallback: bool,
    /// Travel speed assumed by straight-line and road-network estimates
    #[serde(default = "default_fallback_speed_kmh")]
    pub fallback_speed_kmh: f64,
    #[serde(default)]
    pub road_vertices: Option<PathBuf>,
    #[serde(default)]
    pub road_edges: Option<PathBuf>,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Osrm
}

fn default_osrm_url() -> String {
    "http://router.project-osrm.org".to_string()
}

fn default_profile() -> String {
    "driving".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_fallback_speed_kmh() -> f64 {
    30.0
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            osrm_url: default_osrm_url(),
            profile: default_profile(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            straight_line_fallback: false,
            fallback_speed_kmh: default_fallback_speed_kmh(),
            road_vertices: None,
            road_edges: None,
        }
    }
}

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn speed_mps(&self) -> f64 {
        self.fallback_speed_kmh / 3.6
    }
}

/// Main configuration struct used throughout the engine
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub weights: WeightConfig,
    #[serde(default)]
    pub deadlines: DeadlineConfig,
    #[serde(default)]
    pub teams: TeamConfig,
    #[serde(default)]
    pub trip: TripConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
}

impl DispatchConfig {
    /// Determine config file path from the CLI value or environment
    pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_path {
            return path.to_path_buf();
        }
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DispatchConfig =
            toml::from_str(content).map_err(|e| DispatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            DispatchError::Config(msg) => {
                DispatchError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Load from a file; a missing file falls back to validated defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(config_file = %path.display(), "config_missing_using_defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::from_file(path)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        if !w.base_penalty.is_finite() || !w.max_penalty.is_finite() || w.base_penalty < 0.0 {
            return Err(DispatchError::Config(
                "penalties must be finite and non-negative".to_string(),
            ));
        }
        if w.base_penalty >= w.max_penalty {
            return Err(DispatchError::Config(format!(
                "base_penalty ({}) must be lower than max_penalty ({})",
                w.base_penalty, w.max_penalty
            )));
        }

        DeadlineTable::try_from(&self.deadlines)?;

        if self.teams.default_capacity == 0 {
            return Err(DispatchError::Config(
                "default_capacity must be greater than zero".to_string(),
            ));
        }

        let r = &self.routing;
        if r.timeout_ms == 0 {
            return Err(DispatchError::Config("timeout_ms must be greater than zero".to_string()));
        }
        if !(r.fallback_speed_kmh.is_finite() && r.fallback_speed_kmh > 0.0) {
            return Err(DispatchError::Config(
                "fallback_speed_kmh must be positive".to_string(),
            ));
        }
        if r.provider == ProviderKind::RoadNetwork
            && (r.road_vertices.is_none() || r.road_edges.is_none())
        {
            return Err(DispatchError::Config(
                "road_network provider needs road_vertices and road_edges".to_string(),
            ));
        }
        Ok(())
    }
}
