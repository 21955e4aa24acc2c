pub mod assignment;
pub mod dispatch;
pub mod time_window;
pub mod trip_optimizer;
pub mod weights;

// Common algorithm traits
use crate::algorithms::assignment::AssignmentOutcome;
use crate::algorithms::time_window::DeadlineTable;
use crate::error::Result;
use crate::models::{RescueTeam, Victim};
use crate::routing::RoutingProvider;
use chrono::{DateTime, Utc};

/// Trait for victim-to-team assignment strategies
pub trait AssignmentSolver: Send + Sync {
    fn name(&self) -> &str;

    /// Assign every victim to at most one team without exceeding capacities.
    /// Victims no team can take are reported as unserved, never dropped.
    fn assign(
        &self,
        victims: &[&Victim],
        teams: &[RescueTeam],
        deadlines: &DeadlineTable,
        now: DateTime<Utc>,
        provider: &dyn RoutingProvider,
    ) -> Result<AssignmentOutcome>;
}
