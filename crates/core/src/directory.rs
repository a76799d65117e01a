//! Provider, recipient and condition profiles.
//!
//! Profile management proper (demographics, contacts) lives outside the
//! engine; this module keeps just what scheduling and approval need: the
//! intern/mentor relationship, licence identity, active flags, and the
//! recipient's primary-provider pointer. The pointer itself only mutates
//! through the continuity service's reassign path.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::encounter::EncounterStatus;
use crate::error::{ScheduleError, ScheduleResult};
use crate::ids::{ConditionId, ProviderId, RecipientId};
use crate::store::{State, Store};

/// A care provider as the engine sees one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub specialty: String,
    pub license_number: String,
    pub license_date: NaiveDate,
    pub is_intern: bool,
    /// Required for interns, cleared for everyone else.
    pub mentor: Option<ProviderId>,
    pub active: bool,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        specialty: impl Into<String>,
        license_number: impl Into<String>,
        license_date: NaiveDate,
    ) -> Self {
        Self {
            id: ProviderId::generate(),
            name: name.into(),
            specialty: specialty.into(),
            license_number: license_number.into(),
            license_date,
            is_intern: false,
            mentor: None,
            active: true,
        }
    }

    /// An intern supervised by `mentor`.
    pub fn intern(
        name: impl Into<String>,
        specialty: impl Into<String>,
        license_number: impl Into<String>,
        license_date: NaiveDate,
        mentor: ProviderId,
    ) -> Self {
        Self {
            is_intern: true,
            mentor: Some(mentor),
            ..Self::new(name, specialty, license_number, license_date)
        }
    }
}

/// A care recipient, reduced to identity and the primary-provider pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    pub primary_provider: Option<ProviderId>,
    pub active: bool,
}

impl Recipient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RecipientId::generate(),
            name: name.into(),
            primary_provider: None,
            active: true,
        }
    }
}

/// An opaque reference into the external condition taxonomy, validated for
/// existence and activity only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub name: String,
    pub active: bool,
}

impl Condition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ConditionId::generate(),
            name: name.into(),
            active: true,
        }
    }
}

/// Registration and lookup over the profile entities.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<Store>,
}

impl DirectoryService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Inserts or replaces a provider profile after checking the mentor
    /// configuration.
    ///
    /// Rules, enforced here and consumed as preconditions by the approval
    /// chain:
    /// - an intern must have a mentor (`MissingMentor`);
    /// - nobody mentors themself (`SelfMentor`);
    /// - a mentor may not be an intern, in either direction: an intern's
    ///   mentor must be fully licensed, and a provider who currently mentors
    ///   others cannot become an intern (`InternAsMentor`).
    ///
    /// A non-intern's mentor reference is cleared rather than rejected.
    pub fn register_provider(&self, mut provider: Provider) -> ScheduleResult<ProviderId> {
        if provider.license_number.trim().is_empty() {
            return Err(ScheduleError::InvalidInput(
                "provider license_number is required".into(),
            ));
        }

        self.store.transact(|state| {
            if provider.is_intern {
                let mentor = provider.mentor.ok_or(ScheduleError::MissingMentor)?;
                if mentor == provider.id {
                    return Err(ScheduleError::SelfMentor);
                }
                let mentor = state.provider(mentor)?;
                if mentor.is_intern {
                    return Err(ScheduleError::InternAsMentor);
                }
                let mentors_someone = state
                    .providers
                    .values()
                    .any(|p| p.id != provider.id && p.mentor == Some(provider.id));
                if mentors_someone {
                    return Err(ScheduleError::InternAsMentor);
                }
            } else {
                provider.mentor = None;
            }

            let id = provider.id;
            state.providers.insert(id, provider.clone());
            info!(provider = %id, intern = provider.is_intern, "provider registered");
            Ok(id)
        })
    }

    /// Deactivates a provider.
    ///
    /// # Errors
    ///
    /// Returns `HasDependentRecords` while the provider still has planned or
    /// in-progress encounters; those must be completed or cancelled first.
    pub fn deactivate_provider(&self, id: ProviderId) -> ScheduleResult<()> {
        self.store.transact(|state| {
            let open = state
                .encounters
                .values()
                .filter(|e| {
                    e.provider == id
                        && matches!(
                            e.status,
                            EncounterStatus::Planned | EncounterStatus::InProgress
                        )
                })
                .count();
            if open > 0 {
                return Err(ScheduleError::HasDependentRecords(format!(
                    "cannot deactivate a provider with {open} active encounter(s)"
                )));
            }
            state.provider_mut(id)?.active = false;
            info!(provider = %id, "provider deactivated");
            Ok(())
        })
    }

    pub fn register_recipient(&self, recipient: Recipient) -> ScheduleResult<RecipientId> {
        self.store.transact(|state| {
            let id = recipient.id;
            state.recipients.insert(id, recipient);
            Ok(id)
        })
    }

    pub fn register_condition(&self, condition: Condition) -> ScheduleResult<ConditionId> {
        self.store.transact(|state| {
            let id = condition.id;
            state.conditions.insert(id, condition);
            Ok(id)
        })
    }

    pub fn provider(&self, id: ProviderId) -> ScheduleResult<Provider> {
        self.store.read(|state| state.provider(id).cloned())
    }

    pub fn recipient(&self, id: RecipientId) -> ScheduleResult<Recipient> {
        self.store.read(|state| state.recipient(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> DirectoryService {
        DirectoryService::new(Arc::new(Store::default()))
    }

    fn license_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 9, 1).unwrap()
    }

    #[test]
    fn intern_without_mentor_is_rejected() {
        let dir = service();
        let mut intern = Provider::new("Dr. Lea Soriano", "cardiology", "L-1001", license_date());
        intern.is_intern = true;

        assert!(matches!(
            dir.register_provider(intern),
            Err(ScheduleError::MissingMentor)
        ));
    }

    #[test]
    fn self_mentoring_is_rejected() {
        let dir = service();
        let mut p = Provider::new("Dr. Iris Vane", "cardiology", "L-1002", license_date());
        p.is_intern = true;
        p.mentor = Some(p.id);

        assert!(matches!(
            dir.register_provider(p),
            Err(ScheduleError::SelfMentor)
        ));
    }

    #[test]
    fn intern_cannot_be_a_mentor() {
        let dir = service();
        let senior = Provider::new("Dr. Ada Okafor", "cardiology", "L-1003", license_date());
        let senior_id = dir.register_provider(senior).unwrap();

        let intern_a = Provider::intern(
            "Dr. Ben Hale",
            "cardiology",
            "L-1004",
            license_date(),
            senior_id,
        );
        let intern_a_id = dir.register_provider(intern_a).unwrap();

        // Another intern picking intern A as mentor.
        let intern_b = Provider::intern(
            "Dr. Casey Noor",
            "cardiology",
            "L-1005",
            license_date(),
            intern_a_id,
        );
        assert!(matches!(
            dir.register_provider(intern_b),
            Err(ScheduleError::InternAsMentor)
        ));
    }

    #[test]
    fn active_mentor_cannot_become_an_intern() {
        let dir = service();
        let senior = Provider::new("Dr. Ada Okafor", "cardiology", "L-1003", license_date());
        let other = Provider::new("Dr. Remy Qin", "cardiology", "L-1006", license_date());
        let senior_id = dir.register_provider(senior.clone()).unwrap();
        let other_id = dir.register_provider(other).unwrap();

        let intern = Provider::intern(
            "Dr. Ben Hale",
            "cardiology",
            "L-1004",
            license_date(),
            senior_id,
        );
        dir.register_provider(intern).unwrap();

        // Demote the mentor to intern status while someone depends on them.
        let demoted = Provider {
            is_intern: true,
            mentor: Some(other_id),
            ..senior
        };
        assert!(matches!(
            dir.register_provider(demoted),
            Err(ScheduleError::InternAsMentor)
        ));
    }

    #[test]
    fn non_intern_mentor_reference_is_cleared() {
        let dir = service();
        let senior = Provider::new("Dr. Ada Okafor", "cardiology", "L-1003", license_date());
        let senior_id = dir.register_provider(senior).unwrap();

        let mut p = Provider::new("Dr. Remy Qin", "cardiology", "L-1006", license_date());
        p.mentor = Some(senior_id);
        let id = dir.register_provider(p).unwrap();

        assert_eq!(dir.provider(id).unwrap().mentor, None);
    }

    #[test]
    fn empty_license_is_rejected() {
        let dir = service();
        let p = Provider::new("Dr. No Licence", "cardiology", "  ", license_date());
        assert!(matches!(
            dir.register_provider(p),
            Err(ScheduleError::InvalidInput(_))
        ));
    }
}
