// Rescue team model

use crate::models::{Coordinate, TeamId};
use serde::{Deserialize, Serialize};

/// A rescue team available for the current dispatch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueTeam {
    /// Unique identifier for the team
    pub id: TeamId,

    /// Depot or live position; every trip starts here
    pub position: Coordinate,

    /// Maximum number of victims per trip
    pub capacity: u32,
}

impl RescueTeam {
    pub fn new<S: Into<String>>(id: S, position: Coordinate, capacity: u32) -> Self {
        Self {
            id: id.into(),
            position,
            capacity,
        }
    }
}
