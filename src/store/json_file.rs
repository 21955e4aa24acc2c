// JSON snapshot file with a JSON-lines patch log

use crate::error::{DispatchError, Result};
use crate::models::{
    Coordinate, DispatchSnapshot, RescueStatus, RescueTeam, Severity, StatusPatch, Victim,
};
use crate::store::VictimStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    /// Fixed cycle time; absent means "now" at read time
    #[serde(default)]
    taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    victims: BTreeMap<String, VictimRecord>,
    #[serde(default)]
    teams: Vec<TeamRecord>,
}

#[derive(Debug, Deserialize)]
struct VictimRecord {
    victim_data: VictimData,
    #[serde(default)]
    rescue_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VictimData {
    #[serde(default)]
    emergency_status: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    location: Option<LocationRecord>,
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    #[serde(default)]
    lat: Value,
    #[serde(default)]
    lon: Value,
}

#[derive(Debug, Deserialize)]
struct TeamRecord {
    id: String,
    position: Coordinate,
    #[serde(default)]
    capacity: Option<u32>,
}

/// Numbers sometimes arrive as strings in report data
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_rescue_status(label: &str) -> Option<RescueStatus> {
    match label.trim().to_ascii_lowercase().as_str() {
        "" | "pending" => Some(RescueStatus::Pending),
        "assigned" => Some(RescueStatus::Assigned),
        "in_progress" => Some(RescueStatus::InProgress),
        "rescued" => Some(RescueStatus::Rescued),
        _ => None,
    }
}

/// File-backed store for victim reports and team positions
pub struct JsonFileStore {
    snapshot_path: PathBuf,
    patch_log: Option<PathBuf>,
    default_capacity: u32,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(snapshot_path: P, default_capacity: u32) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
            patch_log: None,
            default_capacity,
            write_lock: Mutex::new(()),
        }
    }

    /// Append status patches to this file as JSON lines
    pub fn with_patch_log<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.patch_log = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn parse_snapshot(&self, content: &str) -> Result<DispatchSnapshot> {
        let file: SnapshotFile = serde_json::from_str(content).map_err(|e| {
            DispatchError::Store(format!("{}: {}", self.snapshot_path.display(), e))
        })?;

        let mut victims = Vec::with_capacity(file.victims.len());
        for (id, record) in file.victims {
            let rescue_status = match record.rescue_status.as_deref() {
                None => RescueStatus::Pending,
                Some(label) => parse_rescue_status(label).unwrap_or_else(|| {
                    warn!(victim_id = %id, rescue_status = label, "unknown_rescue_status");
                    RescueStatus::Pending
                }),
            };
            if rescue_status == RescueStatus::Rescued {
                continue;
            }

            let coordinate = record
                .victim_data
                .location
                .as_ref()
                .and_then(|l| Some(Coordinate::new(number(&l.lat)?, number(&l.lon)?)))
                .filter(|c| c.validate().is_ok());
            let Some(coordinate) = coordinate else {
                warn!(victim_id = %id, "victim_skipped_no_location");
                continue;
            };

            let severity = record
                .victim_data
                .emergency_status
                .as_deref()
                .map(Severity::parse)
                .unwrap_or_default();

            victims.push(Victim {
                id,
                coordinate,
                severity,
                status: record.victim_data.status,
                rescue_status,
            });
        }

        let teams = file
            .teams
            .into_iter()
            .map(|t| RescueTeam {
                capacity: t.capacity.unwrap_or(self.default_capacity),
                id: t.id,
                position: t.position,
            })
            .collect();

        Ok(DispatchSnapshot::new(
            file.taken_at.unwrap_or_else(Utc::now),
            victims,
            teams,
        ))
    }

    fn append_line(&self, path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %path.display(), bytes = line.len(), "patch_written");
        Ok(())
    }
}

impl VictimStore for JsonFileStore {
    fn snapshot(&self) -> Result<DispatchSnapshot> {
        let content = fs::read_to_string(&self.snapshot_path).map_err(|e| {
            DispatchError::Store(format!(
                "failed to read {}: {}",
                self.snapshot_path.display(),
                e
            ))
        })?;
        self.parse_snapshot(&content)
    }

    fn patch_status(&self, patch: &StatusPatch) -> Result<()> {
        let Some(path) = &self.patch_log else {
            debug!(victim_id = %patch.victim_id, "patch_log_disabled");
            return Ok(());
        };
        let line = serde_json::to_string(patch).map_err(|e| DispatchError::Store(e.to_string()))?;
        self.append_line(path, &line)
            .map_err(|e| DispatchError::Store(format!("failed to append {}: {}", path.display(), e)))
    }
}
