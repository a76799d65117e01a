//! Clinical scheduling and care-continuity engine.
//!
//! The engine owns four intertwined concerns:
//!
//! - **Availability**: providers publish work and absence slots, weekly or
//!   date-specific, and a generator stamps out date-specific shifts from a
//!   cadence plan ([`availability`], [`scheduling`]).
//! - **Encounters**: visits move through an explicit state machine with
//!   booking validation (availability match, same-day uniqueness, no past
//!   bookings) enforced at every door ([`encounter`], [`scheduling`]).
//! - **Findings**: diagnostic findings attach to completed encounters and
//!   pass through an approval chain; intern findings escalate to their
//!   mentor ([`finding`], [`approvals`]).
//! - **Continuity**: the primary-provider relationship is an append-only
//!   ledger, moved one recipient at a time or a whole panel per
//!   transaction ([`assignment`], [`continuity`]).
//!
//! Everything runs against an in-memory transactional [`store::Store`];
//! multi-step operations commit atomically or not at all. Time comes from
//! an injected [`clock::Clock`] so behaviour is deterministic under test.

pub mod approvals;
pub mod assignment;
pub mod availability;
pub mod clock;
pub mod config;
pub mod continuity;
pub mod directory;
pub mod encounter;
pub mod error;
pub mod finding;
pub mod ids;
pub mod scheduling;
pub mod store;

pub use approvals::{ApprovalService, FindingFilter, NewFinding};
pub use assignment::AssignmentRecord;
pub use availability::{AvailabilitySlot, SlotDay, SlotKind, SlotPlan, WeekCadence};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use continuity::ContinuityService;
pub use directory::{Condition, DirectoryService, Provider, Recipient};
pub use encounter::{Encounter, EncounterKind, EncounterPatch, EncounterStatus};
pub use error::{ScheduleError, ScheduleResult};
pub use finding::{Finding, Severity};
pub use ids::{
    AssignmentId, ConditionId, EncounterId, FindingId, ProviderId, RecipientId, SlotId,
};
pub use scheduling::{BookEncounter, SchedulingService};
pub use store::Store;
