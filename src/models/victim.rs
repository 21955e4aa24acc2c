// Victim model and the status patches written back to the victim store

use crate::models::{Coordinate, Severity, Urgency, VictimId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rescue lifecycle of a victim as recorded in the victim store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueStatus {
    #[default]
    Pending,
    Assigned,
    InProgress,
    Rescued,
}

impl RescueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RescueStatus::Pending => "pending",
            RescueStatus::Assigned => "assigned",
            RescueStatus::InProgress => "in_progress",
            RescueStatus::Rescued => "rescued",
        }
    }
}

/// Read-only snapshot of a reported victim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Victim {
    /// Unique identifier, the store key of the record
    pub id: VictimId,

    /// Reported position
    pub coordinate: Coordinate,

    /// Classified severity
    #[serde(default)]
    pub severity: Severity,

    /// Free-text status from the last report
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub rescue_status: RescueStatus,
}

impl Victim {
    pub fn new<S: Into<String>>(id: S, coordinate: Coordinate, severity: Severity) -> Self {
        Self {
            id: id.into(),
            coordinate,
            severity,
            status: None,
            rescue_status: RescueStatus::Pending,
        }
    }

    pub fn urgency(&self) -> Urgency {
        self.severity.urgency()
    }

    /// Rescued victims are archived and never dispatched again
    pub fn is_archived(&self) -> bool {
        self.rescue_status == RescueStatus::Rescued
    }
}

/// Status update sent back to the victim store after a completed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPatch {
    pub victim_id: VictimId,
    pub rescue_status: RescueStatus,
    pub emergency_status: Severity,
    pub last_updated: DateTime<Utc>,
}
