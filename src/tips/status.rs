use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The user performed the action the tip describes.
    ActionPerformed,
    /// The user closed the tip.
    Closed,
    DisplayCountExceeded,
}

impl InvalidationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidationReason::ActionPerformed => "action_performed",
            InvalidationReason::Closed => "closed",
            InvalidationReason::DisplayCountExceeded => "display_count_exceeded",
        }
    }
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action_performed" => Ok(InvalidationReason::ActionPerformed),
            "closed" => Ok(InvalidationReason::Closed),
            "display_count_exceeded" => Ok(InvalidationReason::DisplayCountExceeded),
            other => Err(format!("Unknown invalidation reason: {}", other)),
        }
    }
}

/// Persisted display state of a tip, kept apart from its eligibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipStatus {
    pub invalidation: Option<InvalidationReason>,
    pub last_displayed: Option<DateTime<Utc>>,
}

impl TipStatus {
    pub fn is_invalidated(&self) -> bool {
        self.invalidation.is_some()
    }
}

/// How often a new tip may appear after another one was displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFrequency {
    #[default]
    Immediate,
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl DisplayFrequency {
    pub fn interval(self) -> Option<Duration> {
        match self {
            DisplayFrequency::Immediate => None,
            DisplayFrequency::Hourly => Some(Duration::hours(1)),
            DisplayFrequency::Daily => Some(Duration::days(1)),
            DisplayFrequency::Weekly => Some(Duration::weeks(1)),
            DisplayFrequency::Monthly => Some(Duration::days(30)),
        }
    }
}
