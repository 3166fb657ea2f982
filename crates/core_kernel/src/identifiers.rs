//! Strongly-typed identifiers for CRM entities
//!
//! Newtype wrappers around UUIDs keep a person id from being passed where a
//! household id is expected. Every table in the schema has a matching type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Identity
define_id!(TenantId, "TNT");
define_id!(UserId, "USR");
define_id!(ProfileId, "PRF");
define_id!(SessionId, "SES");

// Contacts
define_id!(PersonId, "PER");
define_id!(HouseholdId, "HH");
define_id!(TagId, "TAG");

// Mail
define_id!(EmailId, "EML");
define_id!(DraftId, "DRF");
define_id!(NewsletterId, "NWS");
define_id!(AttachmentId, "ATT");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_id_display() {
        let id = PersonId::new();
        assert!(id.to_string().starts_with("PER-"));
    }

    #[test]
    fn test_id_parsing_with_and_without_prefix() {
        let original = HouseholdId::new();
        let parsed: HouseholdId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: HouseholdId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let tenant_id = TenantId::from(uuid);
        let back: Uuid = tenant_id.into();
        assert_eq!(uuid, back);
    }

    #[test]
    fn test_serializes_as_plain_uuid() {
        let id = EmailId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
