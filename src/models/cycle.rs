// Per-cycle input snapshot and output result

use crate::error::{DispatchError, Result};
use crate::models::{RescueTeam, TeamId, Trip, Victim, VictimId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Immutable view of victims and teams for one dispatch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    /// Cycle start; becomes every time window's `ready_at`
    pub taken_at: DateTime<Utc>,
    pub victims: Vec<Victim>,
    pub teams: Vec<RescueTeam>,
}

impl DispatchSnapshot {
    pub fn new(taken_at: DateTime<Utc>, victims: Vec<Victim>, teams: Vec<RescueTeam>) -> Self {
        Self {
            taken_at,
            victims,
            teams,
        }
    }

    /// Rejects duplicate identifiers and unusable coordinates
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for victim in &self.victims {
            if !seen.insert(victim.id.as_str()) {
                return Err(DispatchError::InvalidInput(format!(
                    "duplicate victim id {}",
                    victim.id
                )));
            }
            victim.coordinate.validate()?;
        }

        let mut seen = HashSet::new();
        for team in &self.teams {
            if !seen.insert(team.id.as_str()) {
                return Err(DispatchError::InvalidInput(format!(
                    "duplicate team id {}",
                    team.id
                )));
            }
            team.position.validate()?;
        }
        Ok(())
    }

    /// Victims still awaiting rescue
    pub fn active_victims(&self) -> impl Iterator<Item = &Victim> {
        self.victims.iter().filter(|v| !v.is_archived())
    }
}

/// Route emitted for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRoute {
    pub trip: Trip,

    /// Set when the provider was unavailable and the fallback ordering was used
    pub degraded: bool,
}

/// Outcome of a completed dispatch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle_timestamp: DateTime<Utc>,

    /// One route per team that received at least one victim
    pub routes: BTreeMap<TeamId, TeamRoute>,

    /// Victims no team had capacity for
    pub unserved: Vec<VictimId>,

    /// Assigned victims whose direct ETA already misses their deadline
    #[serde(default)]
    pub at_risk: Vec<VictimId>,
}

impl CycleResult {
    pub fn degraded_teams(&self) -> Vec<&str> {
        self.routes
            .iter()
            .filter(|(_, route)| route.degraded)
            .map(|(team_id, _)| team_id.as_str())
            .collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.routes.values().map(|r| r.trip.victim_count()).sum()
    }

    /// Team serving the given victim, if any
    pub fn team_for(&self, victim_id: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|(_, route)| route.trip.victim_order().contains(&victim_id))
            .map(|(team_id, _)| team_id.as_str())
    }
}
