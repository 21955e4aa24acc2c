// Trip models for representing a team's ordered visiting route

use crate::models::{Coordinate, Meters, Seconds, TeamId, VictimId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One stop of a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stop {
    /// The team's start location
    Depot { coordinate: Coordinate },

    /// A victim pickup, with the routing penalty that ranked it
    Victim {
        victim_id: VictimId,
        coordinate: Coordinate,
        penalty_secs: Seconds,
    },
}

impl Stop {
    pub fn coordinate(&self) -> Coordinate {
        match self {
            Stop::Depot { coordinate } => *coordinate,
            Stop::Victim { coordinate, .. } => *coordinate,
        }
    }

    pub fn victim_id(&self) -> Option<&str> {
        match self {
            Stop::Depot { .. } => None,
            Stop::Victim { victim_id, .. } => Some(victim_id),
        }
    }
}

/// Ordered route for one team: the depot, then its victims in visiting order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub team_id: TeamId,

    /// Depot first, then one stop per assigned victim
    pub stops: Vec<Stop>,

    /// Whether the route closes with a leg back to the depot
    pub returns_to_depot: bool,

    /// Total travel distance
    pub distance_m: Meters,

    /// Total travel duration, penalties excluded
    pub duration_secs: Seconds,

    /// Route line as [lon, lat] pairs, when the provider supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<[f64; 2]>>,
}

impl Trip {
    pub fn depot(&self) -> Option<Coordinate> {
        self.stops.first().map(Stop::coordinate)
    }

    /// Victim identifiers in visiting order
    pub fn victim_order(&self) -> Vec<&str> {
        self.stops.iter().filter_map(Stop::victim_id).collect()
    }

    pub fn victim_count(&self) -> usize {
        self.stops.len().saturating_sub(1)
    }

    /// Coordinates actually travelled, including the closing depot leg
    pub fn waypoints(&self) -> Vec<Coordinate> {
        let mut points: Vec<Coordinate> = self.stops.iter().map(Stop::coordinate).collect();
        if self.returns_to_depot {
            if let Some(depot) = self.depot() {
                points.push(depot);
            }
        }
        points
    }

    /// GeoJSON feature collection with the route line and its summary
    pub fn to_geojson(&self, degraded: bool) -> Value {
        let line: Vec<[f64; 2]> = match &self.geometry {
            Some(geometry) => geometry.clone(),
            None => self.waypoints().iter().map(Coordinate::lon_lat).collect(),
        };

        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": line,
                    },
                    "properties": {
                        "team_id": self.team_id,
                        "distance": self.distance_m,
                        "duration": self.duration_secs,
                        "waypoints": self.victim_order(),
                        "degraded": degraded,
                    }
                }
            ]
        })
    }
}
