// Models module - exports all model types

mod coordinate;
mod cycle;
mod severity;
mod team;
mod trip;
mod victim;

// Re-export model types
pub use self::coordinate::Coordinate;
pub use self::cycle::{CycleResult, DispatchSnapshot, TeamRoute};
pub use self::severity::Severity;
pub use self::team::RescueTeam;
pub use self::trip::{Stop, Trip};
pub use self::victim::{RescueStatus, StatusPatch, Victim};

// Common type aliases for improved code readability
pub type VictimId = String;
pub type TeamId = String;
pub type Seconds = f64;
pub type Meters = f64;

/// Urgency ordinal, 1 = most urgent
pub type Urgency = u8;

pub const MOST_URGENT: Urgency = 1;
pub const LEAST_URGENT: Urgency = 5;
