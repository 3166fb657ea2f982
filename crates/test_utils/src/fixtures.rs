//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for common entities across the CRM.
//! These fixtures are consistent and predictable for unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{TenantContext, TenantId, UserId};
use domain_contacts::{HouseholdInput, PersonInput, TagInput};
use domain_identity::SignUp;
use domain_mail::{
    AttachmentMeta, DraftInput, HeaderField, IncomingEmail, MailAddress, NewsletterInput, OutgoingMessage,
};
use uuid::Uuid;

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A fixed "now" for time-dependent tests
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap()
    }

    /// One day after [`TemporalFixtures::now`]
    pub fn tomorrow() -> DateTime<Utc> {
        Self::now() + chrono::Duration::days(1)
    }

    /// One day before [`TemporalFixtures::now`]
    pub fn yesterday() -> DateTime<Utc> {
        Self::now() - chrono::Duration::days(1)
    }

    pub fn date_of_birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(1985, 4, 12).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a deterministic tenant ID for testing
    pub fn tenant_id() -> TenantId {
        TenantId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// Creates a deterministic user ID for testing
    pub fn user_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    /// A second tenant for isolation tests
    pub fn other_tenant_id() -> TenantId {
        TenantId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }

    pub fn context() -> TenantContext {
        TenantContext::new(Self::tenant_id(), Self::user_id())
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn organization_name() -> &'static str {
        "Riverside Neighbors"
    }

    pub fn organization_slug() -> &'static str {
        "riverside-neighbors"
    }

    pub fn user_email() -> &'static str {
        "organizer@riverside.example"
    }

    /// A password that passes the strength rules
    pub fn password() -> &'static str {
        "correct horse 42 battery"
    }

    pub fn supporter_email() -> &'static str {
        "ann.lee@example.com"
    }
}

/// Fixture for people, households and tags
pub struct ContactFixtures;

impl ContactFixtures {
    pub fn person() -> PersonInput {
        PersonInput {
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            email: Some(StringFixtures::supporter_email().to_string()),
            phone: Some("555-0100".to_string()),
            date_of_birth: Some(TemporalFixtures::date_of_birth()),
            ..Default::default()
        }
    }

    pub fn household() -> HouseholdInput {
        HouseholdInput {
            name: "The Lee Household".to_string(),
            address_line1: Some("12 Elm Street".to_string()),
            city: Some("Springfield".to_string()),
            region: Some("IL".to_string()),
            postal_code: Some("62701".to_string()),
            country: Some("US".to_string()),
            ..Default::default()
        }
    }

    pub fn tag() -> TagInput {
        TagInput {
            name: "Volunteer".to_string(),
            color: Some("#22aa55".to_string()),
            description: Some("Helps at events".to_string()),
        }
    }
}

/// Fixture for mail data
pub struct MailFixtures;

impl MailFixtures {
    pub fn sender() -> MailAddress {
        MailAddress::new(StringFixtures::user_email(), Some("Riverside Organizer")).unwrap()
    }

    pub fn supporter() -> MailAddress {
        MailAddress::new(StringFixtures::supporter_email(), Some("Ann Lee")).unwrap()
    }

    pub fn incoming() -> IncomingEmail {
        IncomingEmail {
            from: Self::supporter(),
            to: vec![Self::sender()],
            cc: Vec::new(),
            subject: "Polling place question".to_string(),
            body_text: Some("Where do I vote this year?".to_string()),
            body_html: None,
            message_id: Some("<q1@example.com>".to_string()),
            in_reply_to: None,
            headers: vec![HeaderField {
                name: "X-Mailer".to_string(),
                value: "Example Mail".to_string(),
            }],
            attachments: vec![AttachmentMeta {
                filename: "map.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                size_bytes: 2048,
                storage_key: "attachments/map.pdf".to_string(),
            }],
            received_at: Some(TemporalFixtures::now()),
        }
    }

    pub fn outgoing() -> OutgoingMessage {
        OutgoingMessage {
            from: Self::sender(),
            to: vec![Self::supporter()],
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: "Re: Polling place question".to_string(),
            body_text: Some("The library on Main Street.".to_string()),
            body_html: None,
            in_reply_to: Some("<q1@example.com>".to_string()),
            message_id: None,
        }
    }

    pub fn draft() -> DraftInput {
        DraftInput {
            to: vec![Self::supporter()],
            subject: "Thanks for volunteering".to_string(),
            body_text: Some("See you Saturday.".to_string()),
            ..Default::default()
        }
    }

    pub fn newsletter() -> NewsletterInput {
        NewsletterInput {
            subject: "October update".to_string(),
            body_text: Some("Hello {{name}}, here is what happened this month.".to_string()),
            body_html: None,
            audience_tag_id: None,
        }
    }
}

/// Fixture for sign-up data
pub struct IdentityFixtures;

impl IdentityFixtures {
    pub fn sign_up() -> SignUp {
        SignUp {
            organization_name: StringFixtures::organization_name().to_string(),
            email: StringFixtures::user_email().to_string(),
            password: StringFixtures::password().to_string(),
            first_name: "Riley".to_string(),
            last_name: "Organizer".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid() {
        assert!(IdentityFixtures::sign_up().validate().is_ok());
        assert!(ContactFixtures::tag().validate().is_ok());
        assert!(MailFixtures::incoming().normalized().is_ok());
        assert!(MailFixtures::outgoing().validate().is_ok());
        assert!(MailFixtures::newsletter().validate().is_ok());
    }

    #[test]
    fn test_temporal_ordering() {
        assert!(TemporalFixtures::yesterday() < TemporalFixtures::now());
        assert!(TemporalFixtures::now() < TemporalFixtures::tomorrow());
    }

    #[test]
    fn test_context_uses_fixture_ids() {
        let ctx = IdFixtures::context();
        assert_eq!(ctx.tenant_id, IdFixtures::tenant_id());
        assert!(ctx.owns(IdFixtures::tenant_id()));
        assert!(!ctx.owns(IdFixtures::other_tenant_id()));
    }
}
