//! The transactional entity store.
//!
//! All persisted entities live in one [`State`] behind a mutex. Mutating
//! operations run through [`Store::transact`], which hands the closure a
//! working copy and installs it only when the closure succeeds: every
//! operation, including multi-step batches, is all-or-nothing, and two
//! racing writers are serialized so both re-observe the uniqueness
//! predicates before committing. Conflicts fail fast with a typed error
//! rather than queueing.
//!
//! There is no shared mutable state outside this store; services coordinate
//! exclusively through it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::assignment::AssignmentRecord;
use crate::availability::AvailabilitySlot;
use crate::directory::{Condition, Provider, Recipient};
use crate::encounter::{Encounter, EncounterStatus};
use crate::error::{ScheduleError, ScheduleResult};
use crate::finding::Finding;
use crate::ids::{
    ConditionId, EncounterId, FindingId, ProviderId, RecipientId, SlotId,
};

/// Every persisted entity, as one cloneable value.
#[derive(Debug, Default, Clone)]
pub struct State {
    pub(crate) providers: HashMap<ProviderId, Provider>,
    pub(crate) recipients: HashMap<RecipientId, Recipient>,
    pub(crate) conditions: HashMap<ConditionId, Condition>,
    pub(crate) slots: HashMap<SlotId, AvailabilitySlot>,
    pub(crate) encounters: HashMap<EncounterId, Encounter>,
    pub(crate) findings: HashMap<FindingId, Finding>,
    /// Append-only; records are closed, never removed.
    pub(crate) assignments: Vec<AssignmentRecord>,
}

impl State {
    pub(crate) fn provider(&self, id: ProviderId) -> ScheduleResult<&Provider> {
        self.providers
            .get(&id)
            .ok_or_else(|| ScheduleError::not_found("provider", id))
    }

    pub(crate) fn provider_mut(&mut self, id: ProviderId) -> ScheduleResult<&mut Provider> {
        self.providers
            .get_mut(&id)
            .ok_or_else(|| ScheduleError::not_found("provider", id))
    }

    pub(crate) fn recipient(&self, id: RecipientId) -> ScheduleResult<&Recipient> {
        self.recipients
            .get(&id)
            .ok_or_else(|| ScheduleError::not_found("recipient", id))
    }

    pub(crate) fn recipient_mut(&mut self, id: RecipientId) -> ScheduleResult<&mut Recipient> {
        self.recipients
            .get_mut(&id)
            .ok_or_else(|| ScheduleError::not_found("recipient", id))
    }

    pub(crate) fn condition(&self, id: ConditionId) -> ScheduleResult<&Condition> {
        self.conditions
            .get(&id)
            .ok_or_else(|| ScheduleError::not_found("condition", id))
    }

    pub(crate) fn encounter(&self, id: EncounterId) -> ScheduleResult<&Encounter> {
        self.encounters
            .get(&id)
            .ok_or_else(|| ScheduleError::not_found("encounter", id))
    }

    pub(crate) fn encounter_mut(&mut self, id: EncounterId) -> ScheduleResult<&mut Encounter> {
        self.encounters
            .get_mut(&id)
            .ok_or_else(|| ScheduleError::not_found("encounter", id))
    }

    pub(crate) fn finding(&self, id: FindingId) -> ScheduleResult<&Finding> {
        self.findings
            .get(&id)
            .ok_or_else(|| ScheduleError::not_found("finding", id))
    }

    pub(crate) fn finding_mut(&mut self, id: FindingId) -> ScheduleResult<&mut Finding> {
        self.findings
            .get_mut(&id)
            .ok_or_else(|| ScheduleError::not_found("finding", id))
    }

    pub(crate) fn slots_for(
        &self,
        provider: ProviderId,
    ) -> impl Iterator<Item = &AvailabilitySlot> {
        self.slots.values().filter(move |s| s.provider == provider)
    }

    /// The same-day uniqueness predicate: is there another non-cancelled
    /// encounter for this provider and recipient on `date`?
    pub(crate) fn conflicting_visit(
        &self,
        provider: ProviderId,
        recipient: RecipientId,
        date: NaiveDate,
        exclude: Option<EncounterId>,
    ) -> bool {
        self.encounters.values().any(|e| {
            Some(e.id) != exclude
                && e.provider == provider
                && e.recipient == recipient
                && e.planned_at.date_naive() == date
                && e.status != EncounterStatus::Cancelled
        })
    }

    pub(crate) fn active_assignment(&self, recipient: RecipientId) -> Option<&AssignmentRecord> {
        self.assignments
            .iter()
            .find(|a| a.recipient == recipient && a.active)
    }

    pub(crate) fn active_assignment_mut(
        &mut self,
        recipient: RecipientId,
    ) -> Option<&mut AssignmentRecord> {
        self.assignments
            .iter_mut()
            .find(|a| a.recipient == recipient && a.active)
    }
}

/// The store itself: shared, thread-safe, transactional.
#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<State>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a working copy of the state and commits the copy
    /// only if `f` returns `Ok`. On `Err` the store is left exactly as it
    /// was, so partially-applied batches never leak out.
    pub fn transact<T>(
        &self,
        f: impl FnOnce(&mut State) -> ScheduleResult<T>,
    ) -> ScheduleResult<T> {
        let mut guard = self.lock();
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }

    /// Runs a read-only closure against a consistent snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another thread panicked mid-read of the
        // guard; the state itself is never left half-written because commits
        // happen by replacement.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Provider;
    use chrono::{TimeZone, Utc};

    use crate::encounter::{Encounter, EncounterKind};

    fn provider() -> Provider {
        Provider::new(
            "Dr. Ada Okafor",
            "general",
            "L-1",
            NaiveDate::from_ymd_opt(2015, 9, 1).unwrap(),
        )
    }

    #[test]
    fn failed_transaction_leaves_state_untouched() {
        let store = Store::new();
        let p = provider();
        let id = p.id;

        let result: ScheduleResult<()> = store.transact(|state| {
            state.providers.insert(id, p.clone());
            Err(ScheduleError::InvalidInput("boom".into()))
        });
        assert!(result.is_err());
        assert!(store.read(|state| state.providers.is_empty()));
    }

    #[test]
    fn successful_transaction_commits() {
        let store = Store::new();
        let p = provider();
        let id = p.id;

        store
            .transact(|state| {
                state.providers.insert(id, p.clone());
                Ok(())
            })
            .unwrap();
        assert!(store.read(|state| state.providers.contains_key(&id)));
    }

    #[test]
    fn conflicting_visit_ignores_cancelled_and_excluded() {
        let mut state = State::default();
        let provider = ProviderId::generate();
        let recipient = RecipientId::generate();
        let planned = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();

        let encounter = Encounter {
            id: EncounterId::generate(),
            recipient,
            provider,
            planned_at: planned,
            actual_start: None,
            kind: EncounterKind::Initial,
            status: EncounterStatus::Planned,
            cost: 0.0,
            currency: "EUR".to_owned(),
            recommendations: None,
        };
        let id = encounter.id;
        state.encounters.insert(id, encounter);

        let date = planned.date_naive();
        assert!(state.conflicting_visit(provider, recipient, date, None));
        // The encounter itself is not its own conflict.
        assert!(!state.conflicting_visit(provider, recipient, date, Some(id)));
        // Other day, other provider: no conflict.
        assert!(!state.conflicting_visit(
            provider,
            recipient,
            date.succ_opt().unwrap(),
            None
        ));
        assert!(!state.conflicting_visit(ProviderId::generate(), recipient, date, None));

        // Cancelled encounters do not block.
        if let Some(e) = state.encounters.get_mut(&id) {
            e.status = EncounterStatus::Cancelled;
        }
        assert!(!state.conflicting_visit(provider, recipient, date, None));
    }
}
