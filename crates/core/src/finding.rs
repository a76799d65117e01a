//! Diagnostic findings attached to completed encounters.
//!
//! A finding carries an approval triple (flag, approving provider, instant)
//! that only moves through the approval service: approve, reject, or the
//! mentor sweep. Both approve and reject are idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ccs_types::Reason;

use crate::ids::{ConditionId, EncounterId, FindingId, ProviderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    Critical,
}

/// A recorded clinical conclusion, pending or carrying approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub encounter: EncounterId,
    pub condition: ConditionId,
    pub description: Reason,
    pub treatment: Option<String>,
    pub severity: Severity,
    pub examined_at: DateTime<Utc>,
    pub approved: bool,
    pub approved_by: Option<ProviderId>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Finding {
    /// Marks the finding approved. Returns `false` (and changes nothing)
    /// when it already is.
    pub(crate) fn approve(&mut self, by: ProviderId, at: DateTime<Utc>) -> bool {
        if self.approved {
            return false;
        }
        self.approved = true;
        self.approved_by = Some(by);
        self.approved_at = Some(at);
        true
    }

    /// Clears the approval triple. Returns `false` when nothing was
    /// approved to begin with.
    pub(crate) fn clear_approval(&mut self) -> bool {
        if !self.approved {
            return false;
        }
        self.approved = false;
        self.approved_by = None;
        self.approved_at = None;
        true
    }
}
