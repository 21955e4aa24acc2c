//! Severity classification of reported victims.
//!
//! Labels come from free-text status reports, so parsing is total: anything
//! that is not a recognised label becomes [`Severity::Unknown`], the least
//! urgent class. Numeric inputs are stricter and fail with `OutOfRange`.

use crate::error::{DispatchError, Result};
use crate::models::{Urgency, LEAST_URGENT, MOST_URGENT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of emergency severities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    VeryUrgent,
    Urgent,
    Stable,
    Unknown,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::VeryUrgent,
        Severity::Urgent,
        Severity::Stable,
        Severity::Unknown,
    ];

    /// Parses a status label; unrecognised or empty labels map to `Unknown`.
    /// Runs of spaces, hyphens and underscores count as one separator.
    pub fn parse(label: &str) -> Self {
        let normalized = label
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        match normalized.as_str() {
            "critical" => Severity::Critical,
            "very_urgent" => Severity::VeryUrgent,
            "urgent" => Severity::Urgent,
            "stable" => Severity::Stable,
            _ => Severity::Unknown,
        }
    }

    /// Urgency ordinal, 1 = most urgent
    pub fn urgency(&self) -> Urgency {
        match self {
            Severity::Critical => 1,
            Severity::VeryUrgent => 2,
            Severity::Urgent => 3,
            Severity::Stable => 4,
            Severity::Unknown => 5,
        }
    }

    pub fn from_urgency(urgency: Urgency) -> Result<Self> {
        match urgency {
            1 => Ok(Severity::Critical),
            2 => Ok(Severity::VeryUrgent),
            3 => Ok(Severity::Urgent),
            4 => Ok(Severity::Stable),
            5 => Ok(Severity::Unknown),
            other => Err(DispatchError::OutOfRange {
                value: other as i64,
                min: MOST_URGENT as i64,
                max: LEAST_URGENT as i64,
            }),
        }
    }

    /// Translates the dashboard risk number, where a higher value is more urgent
    pub fn from_display_risk(risk: i64) -> Result<Self> {
        match risk {
            4 => Ok(Severity::Critical),
            3 => Ok(Severity::VeryUrgent),
            2 => Ok(Severity::Urgent),
            1 => Ok(Severity::Stable),
            0 => Ok(Severity::Unknown),
            other => Err(DispatchError::OutOfRange {
                value: other,
                min: 0,
                max: 4,
            }),
        }
    }

    pub fn display_risk(&self) -> i64 {
        (LEAST_URGENT - self.urgency()) as i64
    }

    pub fn color(&self) -> &'static str {
        match self {
            Severity::Critical => "red",
            Severity::VeryUrgent => "orange",
            Severity::Urgent => "yellow",
            Severity::Stable => "green",
            Severity::Unknown => "white",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::VeryUrgent => "very_urgent",
            Severity::Urgent => "urgent",
            Severity::Stable => "stable",
            Severity::Unknown => "unknown",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Unknown
    }
}

impl From<&str> for Severity {
    fn from(label: &str) -> Self {
        Severity::parse(label)
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        Severity::parse(&label)
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.label().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
