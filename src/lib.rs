// Public modules
pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod routing;
pub mod store;
pub mod utils;

// Re-exports for convenience
pub use algorithms::assignment::{AssignmentOutcome, GreedyAssigner};
pub use algorithms::dispatch::{CancellationToken, Dispatcher};
pub use algorithms::AssignmentSolver;
pub use config::DispatchConfig;
pub use error::{DispatchError, Result};
pub use models::{CycleResult, DispatchSnapshot, RescueTeam, Severity, Trip, Victim};
pub use routing::RoutingProvider;
pub use store::VictimStore;
