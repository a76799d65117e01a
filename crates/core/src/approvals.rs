//! The finding approval chain.
//!
//! Findings attach to recently completed encounters and stay untrusted
//! until a fully licensed provider approves them. Interns cannot
//! self-approve; an administrative sweep approves their findings on the
//! assigned mentor's behalf.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use ccs_types::Reason;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::encounter::EncounterStatus;
use crate::error::{ScheduleError, ScheduleResult};
use crate::finding::{Finding, Severity};
use crate::ids::{ConditionId, EncounterId, FindingId, ProviderId};
use crate::store::Store;

/// A finding-creation request from the examining provider.
#[derive(Debug, Clone)]
pub struct NewFinding {
    pub encounter: EncounterId,
    pub condition: ConditionId,
    pub description: Reason,
    pub treatment: Option<String>,
    pub severity: Severity,
    /// Defaults to the current instant when absent.
    pub examined_at: Option<DateTime<Utc>>,
}

/// Optional filters for the approved-findings query surface.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub provider: Option<ProviderId>,
    pub severity: Option<Severity>,
    pub condition: Option<ConditionId>,
}

/// Creation and authorization of diagnostic findings.
#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    cfg: Arc<EngineConfig>,
}

impl ApprovalService {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, cfg: Arc<EngineConfig>) -> Self {
        Self { store, clock, cfg }
    }

    /// Records a finding against a completed encounter.
    ///
    /// # Errors
    ///
    /// - `EncounterNotCompletable` unless the encounter is `Completed`;
    /// - `PastDateTime` when the encounter's planned instant falls outside
    ///   the configured recency window, when the examination instant is in
    ///   the future, or when it precedes the encounter;
    /// - `NotFound` / `InvalidInput` for a missing or inactive condition.
    pub fn create_finding(&self, request: NewFinding) -> ScheduleResult<Finding> {
        let now = self.clock.now();
        let recency = self.cfg.finding_recency();
        self.store.transact(|state| {
            let encounter = state.encounter(request.encounter)?;
            if encounter.status != EncounterStatus::Completed {
                return Err(ScheduleError::EncounterNotCompletable);
            }
            if encounter.planned_at < now - recency {
                return Err(ScheduleError::PastDateTime(format!(
                    "encounter {} is older than the {}-day window for new findings",
                    encounter.id,
                    recency.num_days()
                )));
            }

            let condition = state.condition(request.condition)?;
            if !condition.active {
                return Err(ScheduleError::InvalidInput(format!(
                    "condition {} is not active",
                    condition.id
                )));
            }

            let examined_at = request.examined_at.unwrap_or(now);
            if examined_at > now {
                return Err(ScheduleError::PastDateTime(
                    "examination instant cannot be in the future".into(),
                ));
            }
            if examined_at < encounter.planned_at {
                return Err(ScheduleError::PastDateTime(
                    "examination instant cannot precede the encounter".into(),
                ));
            }

            let finding = Finding {
                id: FindingId::generate(),
                encounter: request.encounter,
                condition: request.condition,
                description: request.description.clone(),
                treatment: request.treatment.clone(),
                severity: request.severity,
                examined_at,
                approved: false,
                approved_by: None,
                approved_at: None,
            };
            let stored = finding.clone();
            state.findings.insert(finding.id, finding);
            info!(finding = %stored.id, encounter = %stored.encounter, "finding recorded");
            Ok(stored)
        })
    }

    /// Approves a finding on behalf of `acting_provider`.
    ///
    /// Idempotent: approving an already-approved finding changes nothing and
    /// keeps the original approver.
    ///
    /// # Errors
    ///
    /// `UnauthorizedApproval` when the acting provider is an intern.
    pub fn approve_finding(
        &self,
        id: FindingId,
        acting_provider: ProviderId,
    ) -> ScheduleResult<Finding> {
        let now = self.clock.now();
        self.store.transact(|state| {
            let actor = state.provider(acting_provider)?;
            if actor.is_intern {
                warn!(finding = %id, actor = %acting_provider, "intern attempted approval");
                return Err(ScheduleError::UnauthorizedApproval);
            }
            let finding = state.finding_mut(id)?;
            if finding.approve(acting_provider, now) {
                info!(finding = %id, approver = %acting_provider, "finding approved");
            }
            Ok(finding.clone())
        })
    }

    /// Clears a finding's approval. Idempotent when nothing was approved.
    pub fn reject_finding(&self, id: FindingId) -> ScheduleResult<Finding> {
        self.store.transact(|state| {
            let finding = state.finding_mut(id)?;
            if finding.clear_approval() {
                info!(finding = %id, "finding approval cleared");
            }
            Ok(finding.clone())
        })
    }

    /// Administrative sweep: approves unapproved findings examined by
    /// interns on their mentor's behalf.
    ///
    /// Interns without a mentor are skipped (the directory normally makes
    /// that configuration unrepresentable). Safe to re-run and to interleave
    /// with manual approvals: each finding transitions at most once.
    ///
    /// Returns the number of findings approved by this sweep.
    pub fn auto_approve_by_mentor(&self) -> ScheduleResult<usize> {
        let now = self.clock.now();
        self.store.transact(|state| {
            // Resolve (finding, mentor) pairs first; the mutable pass below
            // cannot hold a borrow of the encounters map.
            let pending: Vec<(FindingId, ProviderId)> = state
                .findings
                .values()
                .filter(|f| !f.approved)
                .filter_map(|f| {
                    let encounter = state.encounters.get(&f.encounter)?;
                    let examiner = state.providers.get(&encounter.provider)?;
                    if !examiner.is_intern {
                        return None;
                    }
                    match examiner.mentor {
                        Some(mentor) => Some((f.id, mentor)),
                        None => {
                            warn!(finding = %f.id, examiner = %examiner.id, "intern has no mentor; skipped");
                            None
                        }
                    }
                })
                .collect();

            let mut approved = 0;
            for (finding_id, mentor) in pending {
                let finding = state.finding_mut(finding_id)?;
                if finding.approve(mentor, now) {
                    debug!(finding = %finding_id, mentor = %mentor, "auto-approved");
                    approved += 1;
                }
            }
            if approved > 0 {
                info!(count = approved, "mentor sweep approved findings");
            }
            Ok(approved)
        })
    }

    pub fn finding(&self, id: FindingId) -> ScheduleResult<Finding> {
        self.store.read(|state| state.finding(id).cloned())
    }

    /// Approved findings examined inside the range, optionally narrowed by
    /// examining provider, severity and condition. Newest first.
    pub fn findings_approved(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: &FindingFilter,
    ) -> Vec<Finding> {
        self.store.read(|state| {
            let mut findings: Vec<Finding> = state
                .findings
                .values()
                .filter(|f| f.approved && f.examined_at >= from && f.examined_at <= to)
                .filter(|f| match filter.provider {
                    Some(provider) => state
                        .encounters
                        .get(&f.encounter)
                        .is_some_and(|e| e.provider == provider),
                    None => true,
                })
                .filter(|f| filter.severity.map_or(true, |s| f.severity == s))
                .filter(|f| filter.condition.map_or(true, |c| f.condition == c))
                .cloned()
                .collect();
            findings.sort_by(|a, b| b.examined_at.cmp(&a.examined_at));
            findings
        })
    }
}
