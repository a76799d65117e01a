//! Booking, encounter lifecycle and roster management.
//!
//! Every mutation runs inside one store transaction: validation happens
//! against the state the transaction sees, and nothing is written unless
//! every check passes. Booking and rescheduling re-read the same-day
//! uniqueness predicate inside the transaction, so two racing callers can
//! never both commit conflicting encounters.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use ccs_types::{HourOfDay, Reason};

use crate::availability::{
    find_bookable_slot, instant_on, AvailabilitySlot, SlotDay, SlotKind, SlotPlan,
};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::directory::Provider;
use crate::encounter::{
    Encounter, EncounterAction, EncounterKind, EncounterPatch, EncounterStatus,
};
use crate::error::{ScheduleError, ScheduleResult};
use crate::ids::{EncounterId, ProviderId, RecipientId, SlotId};
use crate::store::{State, Store};

/// A booking request.
#[derive(Debug, Clone)]
pub struct BookEncounter {
    pub recipient: RecipientId,
    pub provider: ProviderId,
    pub planned_at: DateTime<Utc>,
    pub kind: EncounterKind,
    pub cost: f64,
}

/// Scheduling operations: slots, bookings and the encounter lifecycle.
#[derive(Clone)]
pub struct SchedulingService {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    cfg: Arc<EngineConfig>,
}

impl SchedulingService {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, cfg: Arc<EngineConfig>) -> Self {
        Self { store, clock, cfg }
    }

    /// Adds a single availability slot for a provider.
    pub fn add_slot(
        &self,
        provider: ProviderId,
        day: SlotDay,
        start: HourOfDay,
        end: HourOfDay,
        kind: SlotKind,
        note: Option<String>,
    ) -> ScheduleResult<SlotId> {
        let slot = AvailabilitySlot::new(provider, day, start, end, kind, note)?;
        self.store.transact(|state| {
            state.provider(provider)?;
            let id = slot.id;
            state.slots.insert(id, slot);
            Ok(id)
        })
    }

    pub fn remove_slot(&self, id: SlotId) -> ScheduleResult<()> {
        self.store.transact(|state| {
            state
                .slots
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| ScheduleError::not_found("slot", id))
        })
    }

    /// Expands a [`SlotPlan`] and atomically replaces the provider's
    /// date-specific work slots within the plan's window. Weekly recurring
    /// slots and non-work slots are untouched, so regeneration is
    /// destructive over exactly the window it covers and idempotent.
    pub fn regenerate_slots(&self, plan: &SlotPlan) -> ScheduleResult<usize> {
        let generated = plan.generate()?;
        let (from, to) = plan.window();
        self.store.transact(|state| {
            state.provider(plan.provider)?;
            state.slots.retain(|_, slot| {
                !(slot.provider == plan.provider
                    && slot.kind == SlotKind::Work
                    && matches!(slot.day, SlotDay::Date(d) if d >= from && d < to))
            });
            let count = generated.len();
            for slot in generated.iter().cloned() {
                state.slots.insert(slot.id, slot);
            }
            info!(provider = %plan.provider, slots = count, %from, %to, "roster regenerated");
            Ok(count)
        })
    }

    /// Whether a work slot of `provider` covers `instant`; returns the
    /// matched slot.
    ///
    /// # Errors
    ///
    /// `NoAvailability` when no work slot covers the instant.
    pub fn is_bookable(
        &self,
        provider: ProviderId,
        instant: DateTime<Utc>,
    ) -> ScheduleResult<AvailabilitySlot> {
        self.store.read(|state| {
            find_bookable_slot(state.slots_for(provider), provider, instant).cloned()
        })
    }

    /// Books a new encounter.
    ///
    /// Validation order, each failing fast with its own error kind: the
    /// planned instant must be in the future (`PastDateTime`), a work slot
    /// must cover it (`NoAvailability`), and no other non-cancelled
    /// encounter may exist for the same provider, recipient and day
    /// (`DuplicateVisit`).
    pub fn book_encounter(&self, request: BookEncounter) -> ScheduleResult<Encounter> {
        let now = self.clock.now();
        self.store.transact(|state| {
            state.recipient(request.recipient)?;
            active_provider(state, request.provider)?;

            validate_booking(
                state,
                request.provider,
                request.recipient,
                request.planned_at,
                now,
                None,
            )?;

            let encounter = Encounter {
                id: EncounterId::generate(),
                recipient: request.recipient,
                provider: request.provider,
                planned_at: request.planned_at,
                actual_start: None,
                kind: request.kind,
                status: EncounterStatus::Planned,
                cost: request.cost,
                currency: self.cfg.default_currency().to_owned(),
                recommendations: None,
            };
            let stored = encounter.clone();
            state.encounters.insert(encounter.id, encounter);
            info!(
                encounter = %stored.id,
                provider = %stored.provider,
                recipient = %stored.recipient,
                planned_at = %stored.planned_at,
                "encounter booked"
            );
            Ok(stored)
        })
    }

    pub fn start_encounter(&self, id: EncounterId) -> ScheduleResult<Encounter> {
        self.apply_action(id, EncounterAction::Start)
    }

    pub fn complete_encounter(&self, id: EncounterId) -> ScheduleResult<Encounter> {
        self.apply_action(id, EncounterAction::Complete)
    }

    pub fn cancel_encounter(&self, id: EncounterId) -> ScheduleResult<Encounter> {
        self.apply_action(id, EncounterAction::Cancel)
    }

    pub fn mark_no_show(&self, id: EncounterId) -> ScheduleResult<Encounter> {
        self.apply_action(id, EncounterAction::MarkNoShow)
    }

    fn apply_action(&self, id: EncounterId, action: EncounterAction) -> ScheduleResult<Encounter> {
        let now = self.clock.now();
        self.store.transact(|state| {
            let encounter = state.encounter_mut(id)?;
            encounter.apply(action, now)?;
            debug!(encounter = %id, status = %encounter.status, "encounter transitioned");
            Ok(encounter.clone())
        })
    }

    /// Applies a partial update.
    ///
    /// Identifying fields are frozen once the encounter is terminal
    /// (`RestrictedMutation`). When the patch moves the booking (provider,
    /// recipient or planned instant), the booking rules are re-validated
    /// against the new target.
    pub fn update_encounter(
        &self,
        id: EncounterId,
        patch: EncounterPatch,
    ) -> ScheduleResult<Encounter> {
        let now = self.clock.now();
        self.store.transact(|state| {
            let current = state.encounter(id)?.clone();
            if current.status.is_terminal() && patch.touches_core_fields() {
                return Err(ScheduleError::RestrictedMutation {
                    status: current.status,
                });
            }

            let mut updated = current;
            if let Some(provider) = patch.provider {
                active_provider(state, provider)?;
                updated.provider = provider;
            }
            if let Some(recipient) = patch.recipient {
                state.recipient(recipient)?;
                updated.recipient = recipient;
            }
            if let Some(planned_at) = patch.planned_at {
                updated.planned_at = planned_at;
            }
            if let Some(kind) = patch.kind {
                updated.kind = kind;
            }
            if let Some(cost) = patch.cost {
                updated.cost = cost;
            }
            if let Some(recommendations) = patch.recommendations.clone() {
                updated.recommendations = Some(recommendations);
            }

            if patch.touches_booking() {
                validate_booking(
                    state,
                    updated.provider,
                    updated.recipient,
                    updated.planned_at,
                    now,
                    Some(id),
                )?;
            }

            state.encounters.insert(id, updated.clone());
            Ok(updated)
        })
    }

    /// Deletes an encounter.
    ///
    /// # Errors
    ///
    /// `HasDependentRecords` while any finding references it; findings must
    /// be removed first or the encounter cancelled instead.
    pub fn delete_encounter(&self, id: EncounterId) -> ScheduleResult<()> {
        self.store.transact(|state| {
            state.encounter(id)?;
            let findings = state.findings.values().filter(|f| f.encounter == id).count();
            if findings > 0 {
                return Err(ScheduleError::HasDependentRecords(format!(
                    "cannot delete an encounter with {findings} linked finding(s)"
                )));
            }
            state.encounters.remove(&id);
            Ok(())
        })
    }

    /// Moves an encounter to a new date, time and optionally provider.
    ///
    /// Allowed only from `Planned` or `InProgress`. The new target is
    /// validated exactly like a fresh booking (future instant, availability,
    /// same-day uniqueness excluding this encounter); on success the status
    /// resets to `Planned`. On any failure the encounter is left untouched.
    pub fn reschedule_visit(
        &self,
        id: EncounterId,
        new_provider: Option<ProviderId>,
        new_date: NaiveDate,
        new_time: HourOfDay,
        reason: &Reason,
    ) -> ScheduleResult<Encounter> {
        let now = self.clock.now();
        self.store.transact(|state| {
            let current = state.encounter(id)?;
            if !matches!(
                current.status,
                EncounterStatus::Planned | EncounterStatus::InProgress
            ) {
                return Err(ScheduleError::InvalidTransition {
                    from: current.status,
                    action: "reschedule",
                });
            }

            let provider = new_provider.unwrap_or(current.provider);
            let recipient = current.recipient;
            active_provider(state, provider)?;

            let planned_at = instant_on(new_date, new_time);
            validate_booking(state, provider, recipient, planned_at, now, Some(id))?;

            let encounter = state.encounter_mut(id)?;
            encounter.provider = provider;
            encounter.planned_at = planned_at;
            encounter.status = EncounterStatus::Planned;
            let rescheduled = encounter.clone();
            info!(
                encounter = %id,
                provider = %provider,
                planned_at = %planned_at,
                reason = %reason,
                "encounter rescheduled"
            );
            Ok(rescheduled)
        })
    }

    pub fn encounter(&self, id: EncounterId) -> ScheduleResult<Encounter> {
        self.store.read(|state| state.encounter(id).cloned())
    }

    /// A recipient's encounters with a planned instant inside the range,
    /// newest first. Read-only; callers must not use this to bypass the
    /// mutation contracts.
    pub fn encounters_in_range(
        &self,
        recipient: RecipientId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Encounter> {
        self.store.read(|state| {
            let mut encounters: Vec<Encounter> = state
                .encounters
                .values()
                .filter(|e| e.recipient == recipient && e.planned_at >= from && e.planned_at <= to)
                .cloned()
                .collect();
            encounters.sort_by(|a, b| b.planned_at.cmp(&a.planned_at));
            encounters
        })
    }

    pub fn provider_slots(&self, provider: ProviderId) -> Vec<AvailabilitySlot> {
        self.store
            .read(|state| state.slots_for(provider).cloned().collect())
    }
}

/// Resolves a provider that may take bookings. Every path that hands an
/// encounter to a provider (booking, patching, rescheduling) goes through
/// this, so a deactivated provider can never accumulate planned encounters.
fn active_provider(state: &State, id: ProviderId) -> ScheduleResult<&Provider> {
    let provider = state.provider(id)?;
    if !provider.active {
        return Err(ScheduleError::InvalidInput(format!(
            "provider {id} is not active"
        )));
    }
    Ok(provider)
}

/// The three booking rules shared by creation, core-field updates and
/// rescheduling. `exclude` removes the encounter being moved from the
/// duplicate scan.
fn validate_booking(
    state: &State,
    provider: ProviderId,
    recipient: RecipientId,
    planned_at: DateTime<Utc>,
    now: DateTime<Utc>,
    exclude: Option<EncounterId>,
) -> ScheduleResult<()> {
    if planned_at < now {
        return Err(ScheduleError::PastDateTime(format!(
            "planned instant {planned_at} is in the past"
        )));
    }
    find_bookable_slot(state.slots_for(provider), provider, planned_at)?;
    let date = planned_at.date_naive();
    if state.conflicting_visit(provider, recipient, date, exclude) {
        return Err(ScheduleError::DuplicateVisit {
            provider,
            recipient,
            date,
        });
    }
    Ok(())
}
