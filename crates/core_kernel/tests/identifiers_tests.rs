//! Unit tests for the identifiers module
//!
//! Covers creation, parsing, conversion and display of every identifier type.

use core_kernel::{
    TenantId, UserId, ProfileId, SessionId, PersonId, HouseholdId, TagId,
    EmailId, DraftId, NewsletterId, AttachmentId, TenantContext,
};
use uuid::Uuid;

mod person_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        assert_ne!(PersonId::new(), PersonId::new());
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = PersonId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = PersonId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = PersonId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("PER-not-a-uuid".parse::<PersonId>().is_err());
        assert!("".parse::<PersonId>().is_err());
    }

    #[test]
    fn test_default_is_random() {
        assert_ne!(PersonId::default(), PersonId::default());
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_all_prefixes() {
        assert_eq!(TenantId::prefix(), "TNT");
        assert_eq!(UserId::prefix(), "USR");
        assert_eq!(ProfileId::prefix(), "PRF");
        assert_eq!(SessionId::prefix(), "SES");
        assert_eq!(PersonId::prefix(), "PER");
        assert_eq!(HouseholdId::prefix(), "HH");
        assert_eq!(TagId::prefix(), "TAG");
        assert_eq!(EmailId::prefix(), "EML");
        assert_eq!(DraftId::prefix(), "DRF");
        assert_eq!(NewsletterId::prefix(), "NWS");
        assert_eq!(AttachmentId::prefix(), "ATT");
    }

    #[test]
    fn test_prefix_of_another_type_is_rejected() {
        let tag = TagId::new();
        // A TAG- prefix is not stripped by PersonId, so the string is not a bare UUID.
        assert!(tag.to_string().parse::<PersonId>().is_err());
    }
}

mod tenant_context_tests {
    use super::*;

    #[test]
    fn test_owns_only_its_tenant() {
        let tenant = TenantId::new();
        let ctx = TenantContext::new(tenant, UserId::new());

        assert!(ctx.owns(tenant));
        assert!(!ctx.owns(TenantId::new()));
    }
}
