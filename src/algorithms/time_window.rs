// Rescue deadlines derived from urgency

use crate::config::DeadlineConfig;
use crate::error::{DispatchError, Result};
use crate::models::{Urgency, LEAST_URGENT, MOST_URGENT};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest rescue deadline accepted for any urgency ordinal
pub const MAX_DEADLINE: Duration = Duration::from_secs(7 * 24 * 3600);

/// Interval in which a victim should be reached; `ready_at <= due_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub ready_at: DateTime<Utc>,
    pub due_by: DateTime<Utc>,
}

impl TimeWindow {
    pub fn length(&self) -> ChronoDuration {
        self.due_by - self.ready_at
    }

    /// Whether an arrival `eta` after `ready_at` still meets the deadline
    pub fn admits(&self, eta: Duration) -> bool {
        match ChronoDuration::from_std(eta) {
            Ok(eta) => self.ready_at + eta <= self.due_by,
            Err(_) => false,
        }
    }
}

/// Step function from urgency ordinal to deadline
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineTable {
    deadlines: [Duration; 5],
}

impl DeadlineTable {
    pub fn new(deadlines: [Duration; 5]) -> Result<Self> {
        if deadlines.iter().any(|d| d.is_zero()) {
            return Err(DispatchError::Config("deadlines must be positive".to_string()));
        }
        if deadlines.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(DispatchError::Config(
                "deadlines must not shrink as urgency decreases".to_string(),
            ));
        }
        if deadlines.iter().any(|d| *d > MAX_DEADLINE) {
            return Err(DispatchError::Config(format!(
                "deadlines must not exceed {} minutes",
                MAX_DEADLINE.as_secs() / 60
            )));
        }
        Ok(Self { deadlines })
    }

    pub fn deadline(&self, urgency: Urgency) -> Result<Duration> {
        if !(MOST_URGENT..=LEAST_URGENT).contains(&urgency) {
            return Err(DispatchError::OutOfRange {
                value: urgency as i64,
                min: MOST_URGENT as i64,
                max: LEAST_URGENT as i64,
            });
        }
        Ok(self.deadlines[(urgency - MOST_URGENT) as usize])
    }

    /// `ready_at = now`, `due_by = now + deadline(urgency)`
    pub fn time_window(&self, urgency: Urgency, now: DateTime<Utc>) -> Result<TimeWindow> {
        let deadline = ChronoDuration::from_std(self.deadline(urgency)?)
            .map_err(|e| DispatchError::InvalidInput(format!("deadline overflow: {}", e)))?;
        let due_by = now
            .checked_add_signed(deadline)
            .ok_or_else(|| DispatchError::InvalidInput("deadline overflows calendar".to_string()))?;

        Ok(TimeWindow {
            ready_at: now,
            due_by,
        })
    }
}

impl Default for DeadlineTable {
    fn default() -> Self {
        let hours = |h: u64| Duration::from_secs(h * 3600);
        Self {
            deadlines: [hours(1), hours(2), hours(4), hours(6), hours(8)],
        }
    }
}

impl TryFrom<&DeadlineConfig> for DeadlineTable {
    type Error = DispatchError;

    fn try_from(config: &DeadlineConfig) -> Result<Self> {
        let minutes: [u64; 5] = config.minutes.as_slice().try_into().map_err(|_| {
            DispatchError::Config(format!(
                "expected 5 deadlines, found {}",
                config.minutes.len()
            ))
        })?;
        let mut deadlines = [Duration::ZERO; 5];
        for (slot, m) in deadlines.iter_mut().zip(minutes) {
            let secs = m.checked_mul(60).ok_or_else(|| {
                DispatchError::Config(format!("deadline of {} minutes is too large", m))
            })?;
            *slot = Duration::from_secs(secs);
        }
        DeadlineTable::new(deadlines)
    }
}
