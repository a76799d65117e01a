//! Append-only primary-provider assignment ledger.
//!
//! A recipient's primary-provider relationship over time is a chain of
//! records; "editing" an assignment means closing the active record and
//! appending a new one. Records are never deleted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ccs_types::Reason;

use crate::ids::{AssignmentId, ProviderId, RecipientId};

/// One bounded span of a recipient's primary-provider relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub recipient: RecipientId,
    pub provider: ProviderId,
    pub start_date: NaiveDate,
    /// `None` while the assignment is active.
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub reason: Reason,
}

impl AssignmentRecord {
    pub fn open(
        recipient: RecipientId,
        provider: ProviderId,
        start_date: NaiveDate,
        reason: Reason,
    ) -> Self {
        Self {
            id: AssignmentId::generate(),
            recipient,
            provider,
            start_date,
            end_date: None,
            active: true,
            reason,
        }
    }

    /// Deactivates the record, recording when it was superseded. A second
    /// close is a no-op and keeps the original end date.
    pub(crate) fn close(&mut self, on: NaiveDate) {
        if self.active {
            self.active = false;
            self.end_date = Some(on);
        }
    }

    /// Days the assignment has lasted: `(end ?? today) - start`, floored at
    /// zero.
    pub fn duration_days(&self, today: NaiveDate) -> i64 {
        let end = self.end_date.unwrap_or(today);
        end.signed_duration_since(self.start_date).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(start: NaiveDate) -> AssignmentRecord {
        AssignmentRecord::open(
            RecipientId::generate(),
            ProviderId::generate(),
            start,
            Reason::new("initial registration").unwrap(),
        )
    }

    #[test]
    fn open_records_are_active_without_end_date() {
        let r = record(date(2025, 1, 10));
        assert!(r.active);
        assert_eq!(r.end_date, None);
    }

    #[test]
    fn close_is_idempotent() {
        let mut r = record(date(2025, 1, 10));
        r.close(date(2025, 3, 1));
        assert!(!r.active);
        assert_eq!(r.end_date, Some(date(2025, 3, 1)));

        // Re-deactivating an already-inactive record keeps the original end.
        r.close(date(2025, 4, 1));
        assert_eq!(r.end_date, Some(date(2025, 3, 1)));
    }

    #[test]
    fn duration_uses_end_date_when_closed() {
        let mut r = record(date(2025, 1, 10));
        r.close(date(2025, 1, 20));
        assert_eq!(r.duration_days(date(2025, 6, 1)), 10);
    }

    #[test]
    fn duration_uses_today_while_active() {
        let r = record(date(2025, 1, 10));
        assert_eq!(r.duration_days(date(2025, 1, 15)), 5);
    }

    #[test]
    fn duration_floors_at_zero() {
        let r = record(date(2025, 1, 10));
        // A start date in the future relative to "today".
        assert_eq!(r.duration_days(date(2025, 1, 1)), 0);
    }
}
