//! Validated parameters for the feature builders
//!
//! Modes and window lengths are checked here, before any query text is
//! assembled, so an unrecognized mode or a negative duration never reaches
//! the database.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Largest accepted window length in hours (one year)
pub const MAX_HOURS: u32 = 8760;

/// Default observation period after ICU admission
pub const DEFAULT_DURATION: Hours = Hours(24);
/// Default lab lookback before ICU admission
pub const DEFAULT_LAB_LOOKBACK: Hours = Hours(8);

/// Selection by time: earliest or latest value in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Chronologically earliest value
    #[default]
    First,
    /// Chronologically latest value
    Last,
}

impl RankMode {
    /// Column suffix for this mode
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

impl FromStr for RankMode {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(ExtractError::invalid_parameter(format!(
                "unsupported aggregation mode '{other}', expected 'first' or 'last'"
            ))),
        }
    }
}

impl fmt::Display for RankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Selection by value: numeric minimum or maximum over the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtremumMode {
    /// Smallest observed value
    #[default]
    Min,
    /// Largest observed value
    Max,
}

impl ExtremumMode {
    /// Column suffix for this mode
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Fold a new value into the running extremum
    #[must_use]
    pub fn combine(self, current: Option<f64>, value: f64) -> Option<f64> {
        Some(match (self, current) {
            (_, None) => value,
            (Self::Min, Some(c)) => c.min(value),
            (Self::Max, Some(c)) => c.max(value),
        })
    }
}

impl FromStr for ExtremumMode {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(ExtractError::invalid_parameter(format!(
                "unsupported aggregation mode '{other}', expected 'min' or 'max'"
            ))),
        }
    }
}

impl fmt::Display for ExtremumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A non-negative number of hours, bounded by [`MAX_HOURS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Hours(u32);

impl Hours {
    /// Zero-length offset
    pub const ZERO: Self = Self(0);

    /// Validate an hour count
    pub fn new(hours: u32) -> Result<Self> {
        if hours > MAX_HOURS {
            return Err(ExtractError::invalid_parameter(format!(
                "{hours} hours exceeds the maximum window of {MAX_HOURS} hours"
            )));
        }
        Ok(Self(hours))
    }

    /// Hour count
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Hour count as a bindable database integer
    #[must_use]
    pub fn as_i32(self) -> i32 {
        // MAX_HOURS fits comfortably in i32
        self.0 as i32
    }

    /// Length as a chrono duration
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::hours(i64::from(self.0))
    }
}

impl TryFrom<i64> for Hours {
    type Error = ExtractError;

    fn try_from(value: i64) -> Result<Self> {
        let hours = u32::try_from(value).map_err(|_| {
            ExtractError::invalid_parameter(format!(
                "hour count must be between 0 and {MAX_HOURS}, got {value}"
            ))
        })?;
        Self::new(hours)
    }
}

impl FromStr for Hours {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ExtractError::invalid_parameter(format!("'{s}' is not an hour count")))?;
        Self::try_from(value)
    }
}

impl<'de> Deserialize<'de> for Hours {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}

/// Eligible interval around ICU admission: `[intime - lookback, intime + duration]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationWindow {
    /// Hours before ICU admission still considered eligible
    pub lookback: Hours,
    /// Hours after ICU admission
    pub duration: Hours,
}

impl ObservationWindow {
    /// Window starting at ICU admission
    #[must_use]
    pub const fn after_admission(duration: Hours) -> Self {
        Self {
            lookback: Hours::ZERO,
            duration,
        }
    }

    /// Window that also reaches back before ICU admission
    #[must_use]
    pub const fn with_lookback(duration: Hours, lookback: Hours) -> Self {
        Self { lookback, duration }
    }

    /// Whether `charttime` falls in the window anchored at `intime` (both ends inclusive)
    #[must_use]
    pub fn contains(&self, intime: NaiveDateTime, charttime: NaiveDateTime) -> bool {
        charttime >= intime - self.lookback.as_duration()
            && charttime <= intime + self.duration.as_duration()
    }
}
