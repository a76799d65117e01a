//! Typed identifiers for the engine's entities.
//!
//! Every entity gets its own UUID wrapper so a provider id can never be
//! passed where a recipient id is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a care provider.
    ProviderId
);
entity_id!(
    /// Identifies a care recipient.
    RecipientId
);
entity_id!(
    /// Identifies an availability slot.
    SlotId
);
entity_id!(
    /// Identifies an encounter (visit).
    EncounterId
);
entity_id!(
    /// Identifies a diagnostic finding.
    FindingId
);
entity_id!(
    /// Identifies a condition in the external taxonomy.
    ConditionId
);
entity_id!(
    /// Identifies one assignment-history ledger entry.
    AssignmentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(ProviderId::generate(), ProviderId::generate());
    }

    #[test]
    fn id_serialises_as_bare_uuid() {
        let id = EncounterId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.uuid()));
    }

    #[test]
    fn id_round_trips_through_uuid() {
        let raw = Uuid::new_v4();
        assert_eq!(RecipientId::from_uuid(raw).uuid(), raw);
    }
}
