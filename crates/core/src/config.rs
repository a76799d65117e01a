//! Engine configuration.
//!
//! Configuration is resolved once at startup and passed into services,
//! avoiding ambient environment reads during request handling.

use chrono::Duration;

use crate::error::{ScheduleError, ScheduleResult};

/// Default recency window for attaching findings to completed encounters.
pub const DEFAULT_FINDING_RECENCY_DAYS: i64 = 30;

/// Engine configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    default_currency: String,
    finding_recency_days: i64,
}

impl EngineConfig {
    /// Create a new `EngineConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::InvalidInput` if the currency code is empty
    /// or the recency window is not positive.
    pub fn new(default_currency: impl Into<String>, finding_recency_days: i64) -> ScheduleResult<Self> {
        let default_currency = default_currency.into();
        if default_currency.trim().is_empty() {
            return Err(ScheduleError::InvalidInput(
                "default_currency cannot be empty".into(),
            ));
        }
        if finding_recency_days <= 0 {
            return Err(ScheduleError::InvalidInput(
                "finding_recency_days must be positive".into(),
            ));
        }
        Ok(Self {
            default_currency,
            finding_recency_days,
        })
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// The recency window as a duration.
    pub fn finding_recency(&self) -> Duration {
        Duration::days(self.finding_recency_days)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_owned(),
            finding_recency_days: DEFAULT_FINDING_RECENCY_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_currency() {
        assert!(EngineConfig::new("  ", 30).is_err());
    }

    #[test]
    fn rejects_non_positive_recency() {
        assert!(EngineConfig::new("USD", 0).is_err());
        assert!(EngineConfig::new("USD", -5).is_err());
    }

    #[test]
    fn default_uses_thirty_day_window() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.finding_recency(), Duration::days(30));
        assert_eq!(cfg.default_currency(), "EUR");
    }
}
