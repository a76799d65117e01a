//! Care-continuity: the primary-provider relationship over time.
//!
//! Reassignment is the only path that moves a recipient's
//! primary-provider pointer, and every move leaves a ledger record
//! behind. The mass variant moves a whole panel of recipients in one
//! transaction.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use ccs_types::Reason;

use crate::assignment::AssignmentRecord;
use crate::clock::Clock;
use crate::error::{ScheduleError, ScheduleResult};
use crate::ids::{ProviderId, RecipientId};
use crate::store::{State, Store};

/// Reassignment and ledger queries.
#[derive(Clone)]
pub struct ContinuityService {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl ContinuityService {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Moves a recipient to a new primary provider.
    ///
    /// Closes the active ledger record (if any) with `effective` as its end
    /// date, appends a new active record starting the same day, and updates
    /// the recipient's primary-provider pointer. `effective` defaults to
    /// today.
    ///
    /// Reassigning to the provider already in charge is a silent no-op and
    /// returns `None`; otherwise the new active record is returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown recipient or provider;
    /// - `InvalidInput` when the new provider is inactive.
    pub fn reassign(
        &self,
        recipient: RecipientId,
        new_provider: ProviderId,
        effective: Option<NaiveDate>,
        reason: Reason,
    ) -> ScheduleResult<Option<AssignmentRecord>> {
        let effective = effective.unwrap_or_else(|| self.clock.today());
        self.store.transact(|state| {
            reassign_in(state, recipient, new_provider, effective, &reason)
        })
    }

    /// Moves every listed recipient from `old_provider` to `new_provider`
    /// in one transaction: either all of them move, or none do.
    ///
    /// Recipients whose primary provider is not `old_provider` fail the
    /// whole batch with `InvalidInput`; a caller handing over a panel should
    /// not silently lose stragglers.
    ///
    /// Returns the number of recipients moved.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when the two providers are the same, the recipient
    ///   list is empty, a recipient is not currently under `old_provider`,
    ///   or the new provider is inactive;
    /// - `NotFound` for any unknown id, in which case no recipient moves.
    pub fn mass_reassign(
        &self,
        old_provider: ProviderId,
        new_provider: ProviderId,
        recipients: &[RecipientId],
        effective: Option<NaiveDate>,
        reason: Reason,
    ) -> ScheduleResult<usize> {
        if old_provider == new_provider {
            return Err(ScheduleError::InvalidInput(
                "mass reassignment requires two distinct providers".into(),
            ));
        }
        if recipients.is_empty() {
            return Err(ScheduleError::InvalidInput(
                "mass reassignment requires at least one recipient".into(),
            ));
        }

        let effective = effective.unwrap_or_else(|| self.clock.today());
        let moved = self.store.transact(|state| {
            state.provider(old_provider)?;
            let mut moved = 0;
            for &recipient in recipients {
                let current = state.recipient(recipient)?.primary_provider;
                if current != Some(old_provider) {
                    return Err(ScheduleError::InvalidInput(format!(
                        "recipient {recipient} is not assigned to provider {old_provider}"
                    )));
                }
                if reassign_in(state, recipient, new_provider, effective, &reason)?.is_some() {
                    moved += 1;
                }
            }
            Ok(moved)
        })?;
        info!(
            from = %old_provider,
            to = %new_provider,
            moved,
            "panel reassigned"
        );
        Ok(moved)
    }

    /// The recipient's full assignment ledger, newest first.
    pub fn assignment_history(&self, recipient: RecipientId) -> Vec<AssignmentRecord> {
        self.store.read(|state| {
            let mut records: Vec<AssignmentRecord> = state
                .assignments
                .iter()
                .filter(|a| a.recipient == recipient)
                .cloned()
                .collect();
            records.sort_by(|a, b| b.start_date.cmp(&a.start_date));
            records
        })
    }

    pub fn active_assignment(&self, recipient: RecipientId) -> Option<AssignmentRecord> {
        self.store
            .read(|state| state.active_assignment(recipient).cloned())
    }
}

fn reassign_in(
    state: &mut State,
    recipient: RecipientId,
    new_provider: ProviderId,
    effective: NaiveDate,
    reason: &Reason,
) -> ScheduleResult<Option<AssignmentRecord>> {
    let provider = state.provider(new_provider)?;
    if !provider.active {
        return Err(ScheduleError::InvalidInput(format!(
            "provider {new_provider} is not active"
        )));
    }
    let current = state.recipient(recipient)?.primary_provider;
    if current == Some(new_provider) {
        debug!(recipient = %recipient, provider = %new_provider, "already assigned; no-op");
        return Ok(None);
    }

    if let Some(active) = state.active_assignment_mut(recipient) {
        active.close(effective);
    }
    let record = AssignmentRecord::open(recipient, new_provider, effective, reason.clone());
    state.assignments.push(record.clone());
    state.recipient_mut(recipient)?.primary_provider = Some(new_provider);
    info!(recipient = %recipient, provider = %new_provider, "primary provider reassigned");
    Ok(Some(record))
}
