//! Error taxonomy for the scheduling engine.
//!
//! All variants are caller-recoverable validation failures. They are raised
//! synchronously at the point of the violated invariant, before any write is
//! committed, and abort the enclosing transaction entirely.

use chrono::{DateTime, NaiveDate, Utc};

use crate::encounter::EncounterStatus;
use crate::ids::{ProviderId, RecipientId};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("end time must be later than start time")]
    InvalidTimeRange,

    #[error("provider {provider} has no work slot covering {instant}")]
    NoAvailability {
        provider: ProviderId,
        instant: DateTime<Utc>,
    },

    #[error("a recipient can only have one visit with the same provider per day ({date})")]
    DuplicateVisit {
        provider: ProviderId,
        recipient: RecipientId,
        date: NaiveDate,
    },

    #[error("date/time is outside the allowed window: {0}")]
    PastDateTime(String),

    #[error("cannot modify core details of an encounter in {status} status")]
    RestrictedMutation { status: EncounterStatus },

    #[error("an intern cannot approve findings")]
    UnauthorizedApproval,

    #[error("an intern must have a mentor assigned")]
    MissingMentor,

    #[error("a provider cannot be their own mentor")]
    SelfMentor,

    #[error("an intern cannot act as a mentor")]
    InternAsMentor,

    #[error("cannot {action} an encounter in {from} status")]
    InvalidTransition {
        from: EncounterStatus,
        action: &'static str,
    },

    #[error("findings can only be attached to completed encounters")]
    EncounterNotCompletable,

    #[error("{0}")]
    HasDependentRecords(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Type(#[from] ccs_types::TypeError),
}

impl ScheduleError {
    /// Shorthand for a [`ScheduleError::NotFound`] with a displayable id.
    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type ScheduleResult<T> = std::result::Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = ScheduleError::InvalidTransition {
            from: EncounterStatus::Completed,
            action: "cancel",
        };
        assert_eq!(err.to_string(), "cannot cancel an encounter in completed status");

        let err = ScheduleError::not_found("provider", "abc");
        assert_eq!(err.to_string(), "provider abc not found");
    }
}
