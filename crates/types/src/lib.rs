//! Validated primitive types shared across the scheduling engine.
//!
//! Free-text fields (reassignment reasons, finding descriptions) and roster
//! times are validated once at the boundary and carried as these wrappers so
//! the core never re-checks them.

use serde::{Deserialize, Serialize};

/// Validation failures for the wrapper types in this crate.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// Free text was empty or contained only whitespace
    #[error("text cannot be empty")]
    EmptyText,
    /// An hour value was not a finite number within `[0, 24]`
    #[error("hour must be a finite value between 0 and 24")]
    HourOutOfRange,
}

/// Free text guaranteed to contain at least one non-whitespace character.
///
/// Input is trimmed during construction, so leading and trailing whitespace
/// never reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Reason(String);

impl Reason {
    /// Trims the input and wraps it, rejecting empty results.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyText);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Reason {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Reason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Reason::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A fractional hour of the day within `[0, 24]`.
///
/// Clinical rosters express working hours as decimal hours (`8.5` means
/// 08:30), so this wraps an `f64` rather than a clock time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct HourOfDay(f64);

impl HourOfDay {
    /// Wraps an hour value, rejecting non-finite or out-of-range input.
    pub fn new(hours: f64) -> Result<Self, TypeError> {
        if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
            return Err(TypeError::HourOutOfRange);
        }
        Ok(Self(hours))
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for HourOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let minutes = (self.0.fract() * 60.0).round() as u32;
        // values like 7.999 round up to a whole hour of minutes
        if minutes == 60 {
            write!(f, "{:02}:00", self.0.trunc() as u32 + 1)
        } else {
            write!(f, "{:02}:{:02}", self.0.trunc() as u32, minutes)
        }
    }
}

impl<'de> Deserialize<'de> for HourOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = f64::deserialize(deserializer)?;
        HourOfDay::new(v).map_err(serde::de::Error::custom)
    }
}
