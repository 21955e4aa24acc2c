// Error taxonomy shared by every stage of a dispatch cycle

use thiserror::Error;

/// Errors raised while building routes and assignments.
///
/// Capacity exhaustion is not represented here: victims that no team can
/// take are reported in [`crate::models::CycleResult::unserved`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// A severity or urgency value outside its closed range
    #[error("value {value} outside accepted range {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    /// Empty or malformed coordinates, stop lists or snapshots
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The routing provider is unreachable or returned incomplete data
    #[error("routing provider unavailable: {0}")]
    RoutingUnavailable(String),

    /// The cycle was cancelled before it could complete
    #[error("dispatch cycle cancelled")]
    Cancelled,

    /// Configuration failed validation
    #[error("configuration error: {0}")]
    Config(String),

    /// The victim store could not be read or written
    #[error("victim store error: {0}")]
    Store(String),
}

impl DispatchError {
    /// Whether a failed external call is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, DispatchError::RoutingUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
