//! Encounters (visits) and their lifecycle.
//!
//! Status handling is a closed enum with an explicit transition table:
//! `Planned -> InProgress -> Completed`, with `Cancelled` reachable from
//! `Planned` and `InProgress`, and `NoShow` from `Planned` only. Terminal
//! states have no exits, and once an encounter reaches one its identifying
//! fields are frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};
use crate::ids::{EncounterId, ProviderId, RecipientId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterKind {
    Initial,
    FollowUp,
    Preventive,
    Emergency,
    Consultation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl EncounterStatus {
    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EncounterStatus::Completed | EncounterStatus::Cancelled | EncounterStatus::NoShow
        )
    }
}

impl std::fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EncounterStatus::Planned => "planned",
            EncounterStatus::InProgress => "in_progress",
            EncounterStatus::Completed => "completed",
            EncounterStatus::Cancelled => "cancelled",
            EncounterStatus::NoShow => "no_show",
        };
        f.write_str(label)
    }
}

/// Lifecycle actions a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterAction {
    Start,
    Complete,
    Cancel,
    MarkNoShow,
}

impl EncounterAction {
    pub fn as_str(self) -> &'static str {
        match self {
            EncounterAction::Start => "start",
            EncounterAction::Complete => "complete",
            EncounterAction::Cancel => "cancel",
            EncounterAction::MarkNoShow => "mark as no-show",
        }
    }
}

/// The transition table. Any `(state, action)` pair not listed here is an
/// `InvalidTransition`.
pub fn transition(
    from: EncounterStatus,
    action: EncounterAction,
) -> ScheduleResult<EncounterStatus> {
    use EncounterAction::*;
    use EncounterStatus::*;

    match (from, action) {
        (Planned, Start) => Ok(InProgress),
        (InProgress, Complete) => Ok(Completed),
        (Planned, Cancel) | (InProgress, Cancel) => Ok(Cancelled),
        (Planned, MarkNoShow) => Ok(NoShow),
        _ => Err(ScheduleError::InvalidTransition {
            from,
            action: action.as_str(),
        }),
    }
}

/// A scheduled or occurred meeting between a recipient and a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub recipient: RecipientId,
    pub provider: ProviderId,
    pub planned_at: DateTime<Utc>,
    /// Set once, on the transition to `InProgress`.
    pub actual_start: Option<DateTime<Utc>>,
    pub kind: EncounterKind,
    pub status: EncounterStatus,
    pub cost: f64,
    pub currency: String,
    pub recommendations: Option<String>,
}

impl Encounter {
    /// Applies a lifecycle action, consulting the transition table.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::InvalidTransition` when the action is not
    /// defined for the current status.
    pub fn apply(&mut self, action: EncounterAction, now: DateTime<Utc>) -> ScheduleResult<()> {
        self.status = transition(self.status, action)?;
        if action == EncounterAction::Start {
            self.actual_start = Some(now);
        }
        Ok(())
    }

    /// Hours between the planned and the actual start, absolute; zero until
    /// the encounter starts.
    pub fn delay_hours(&self) -> f64 {
        match self.actual_start {
            Some(actual) => {
                let delta = actual.signed_duration_since(self.planned_at);
                (delta.num_minutes() as f64 / 60.0).abs()
            }
            None => 0.0,
        }
    }
}

/// A partial update to an encounter's editable fields.
///
/// Identifying fields (provider, recipient, planned instant, kind) may only
/// change while the encounter has not reached a terminal status, and only
/// through the scheduling service so booking rules are re-validated.
#[derive(Debug, Clone, Default)]
pub struct EncounterPatch {
    pub provider: Option<ProviderId>,
    pub recipient: Option<RecipientId>,
    pub planned_at: Option<DateTime<Utc>>,
    pub kind: Option<EncounterKind>,
    pub cost: Option<f64>,
    pub recommendations: Option<String>,
}

impl EncounterPatch {
    /// Whether the patch touches any identifying field.
    pub fn touches_core_fields(&self) -> bool {
        self.provider.is_some()
            || self.recipient.is_some()
            || self.planned_at.is_some()
            || self.kind.is_some()
    }

    /// Whether the patch changes where or when the encounter is booked,
    /// requiring availability and uniqueness re-validation.
    pub fn touches_booking(&self) -> bool {
        self.provider.is_some() || self.recipient.is_some() || self.planned_at.is_some()
    }
}
