//! Tests for the mail domain

use chrono::{Duration, Utc};
use domain_mail::{
    message_for_recipient, personalize, plan_trash, restore_target, DraftInput, Folder,
    IncomingEmail, MailAddress, MailError, NewsletterInput, NewsletterStatus, OutgoingMessage,
};
use proptest::prelude::*;

fn address(addr: &str) -> MailAddress {
    MailAddress::new(addr, None).unwrap()
}

fn outgoing(to: Vec<MailAddress>) -> OutgoingMessage {
    OutgoingMessage {
        from: address("office@campaign.org"),
        to,
        cc: vec![],
        bcc: vec![],
        subject: "Canvass this weekend".to_string(),
        body_text: Some("Meet at the office at 9.".to_string()),
        body_html: None,
        in_reply_to: None,
        message_id: None,
    }
}

mod folder_tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Inbox".parse::<Folder>().unwrap(), Folder::Inbox);
        assert_eq!("ARCHIVE".parse::<Folder>().unwrap(), Folder::Archive);
        assert!(matches!("outbox".parse::<Folder>(), Err(MailError::UnknownFolder(_))));
    }

    #[test]
    fn test_trash_is_not_a_move_target() {
        assert!(Folder::Trash.ensure_move_target().is_err());
        assert!(Folder::Archive.ensure_move_target().is_ok());
    }

    #[test]
    fn test_round_trip_through_text() {
        for folder in Folder::ALL {
            assert_eq!(Folder::try_from(folder.to_string()).unwrap(), folder);
        }
    }
}

mod message_tests {
    use super::*;

    #[test]
    fn test_address_is_lowercased() {
        let addr = MailAddress::new("  Jane.Doe@Example.COM ", Some("Jane")).unwrap();
        assert_eq!(addr.address, "jane.doe@example.com");
        assert_eq!(addr.domain(), "example.com");
        assert_eq!(addr.to_string(), "Jane <jane.doe@example.com>");
    }

    #[test]
    fn test_outgoing_requires_recipient() {
        let err = outgoing(vec![]).validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_outgoing_valid() {
        assert!(outgoing(vec![address("voter@example.com")]).validate().is_ok());
    }

    #[test]
    fn test_message_id_uses_sender_domain() {
        let mut message = outgoing(vec![address("voter@example.com")]);
        let id = message.assign_message_id().to_string();
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@campaign.org>"));
        assert_eq!(message.message_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_incoming_snippet() {
        let incoming = IncomingEmail {
            from: address("voter@example.com"),
            to: vec![address("office@campaign.org")],
            cc: vec![],
            subject: "Question".to_string(),
            body_text: None,
            body_html: Some("<p>Where do I vote?</p>".to_string()),
            message_id: Some("<q1@example.com>".to_string()),
            in_reply_to: None,
            headers: vec![],
            attachments: vec![],
            received_at: None,
        };
        assert_eq!(incoming.snippet(), "Where do I vote?");
        assert!(incoming.normalized().is_ok());
    }

    #[test]
    fn test_incoming_addresses_are_normalized() {
        let raw = |address: &str, name: Option<&str>| MailAddress {
            address: address.to_string(),
            name: name.map(str::to_string),
        };
        let incoming = IncomingEmail {
            from: raw("  Voter@Example.COM ", Some("  Vera Voter ")),
            to: vec![raw("Office@Campaign.org", None)],
            cc: vec![raw(" CC@Campaign.org", Some(""))],
            subject: "Question".to_string(),
            body_text: Some("Hi".to_string()),
            body_html: None,
            message_id: None,
            in_reply_to: None,
            headers: vec![domain_mail::HeaderField {
                name: " X-Mailer ".to_string(),
                value: "Mutt".to_string(),
            }],
            attachments: vec![],
            received_at: None,
        };

        let normalized = incoming.normalized().unwrap();
        assert_eq!(normalized.from, MailAddress::new("voter@example.com", Some("Vera Voter")).unwrap());
        assert_eq!(normalized.to[0].address, "office@campaign.org");
        assert_eq!(normalized.cc[0], raw("cc@campaign.org", None));
        assert_eq!(normalized.headers[0].name, "X-Mailer");
    }

    #[test]
    fn test_incoming_with_bad_address_is_rejected() {
        let incoming = IncomingEmail {
            from: MailAddress {
                address: "not an address".to_string(),
                name: None,
            },
            to: vec![],
            cc: vec![],
            subject: String::new(),
            body_text: None,
            body_html: None,
            message_id: None,
            in_reply_to: None,
            headers: vec![],
            attachments: vec![],
            received_at: None,
        };
        assert!(matches!(incoming.normalized(), Err(MailError::InvalidAddress(_))));
    }
}

mod trash_tests {
    use super::*;

    #[test]
    fn test_restore_returns_to_previous_folder() {
        let decision = plan_trash(Folder::Archive).unwrap();
        assert_eq!(restore_target(Some(decision.previous_folder)), Folder::Archive);
    }

    #[test]
    fn test_double_trash_is_a_conflict() {
        let err = plan_trash(Folder::Trash).unwrap_err();
        assert!(err.is_conflict());
    }
}

mod draft_tests {
    use super::*;

    #[test]
    fn test_draft_becomes_outgoing() {
        let draft = DraftInput {
            to: vec![MailAddress {
                address: "Volunteer@Example.com".to_string(),
                name: None,
            }],
            subject: "  Thanks ".to_string(),
            body_text: Some("Thank you!".to_string()),
            ..Default::default()
        }
        .normalized()
        .unwrap();

        assert_eq!(draft.to[0].address, "volunteer@example.com");
        assert_eq!(draft.subject, "Thanks");

        let message = draft.into_outgoing(address("office@campaign.org"), Some("<x@y>".to_string()));
        assert!(message.validate().is_ok());
        assert_eq!(message.in_reply_to.as_deref(), Some("<x@y>"));
    }
}

mod newsletter_tests {
    use super::*;

    #[test]
    fn test_newsletter_input_validation() {
        let mut input = NewsletterInput {
            subject: "October update".to_string(),
            body_text: Some("Hello {{name}}".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        input.subject = "   ".to_string();
        assert!(input.validate().is_err());

        input.subject = "October update".to_string();
        input.body_text = Some("  ".to_string());
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_schedule_then_unschedule() {
        let now = Utc::now();
        let scheduled = NewsletterStatus::Draft
            .schedule(now + Duration::days(1), now)
            .unwrap();
        assert_eq!(scheduled.unschedule().unwrap(), NewsletterStatus::Draft);
        assert!(NewsletterStatus::Draft.unschedule().is_err());
    }

    #[test]
    fn test_personalized_copy() {
        let from = address("office@campaign.org");
        let recipient = MailAddress::new("ann@example.com", Some("Ann")).unwrap();
        let message = message_for_recipient(
            &from,
            recipient,
            "News for {{name}}",
            Some("Dear {{name}},"),
            None,
        );
        assert_eq!(message.subject, "News for Ann");
        assert_eq!(message.body_text.as_deref(), Some("Dear Ann,"));
        assert_eq!(message.to.len(), 1);
        assert!(message.bcc.is_empty());
    }

    #[test]
    fn test_personalize_fallback() {
        assert_eq!(personalize("Hi {{name}}", None), "Hi friend");
        assert_eq!(personalize("Hi {{name}}", Some("  ")), "Hi friend");
    }
}

proptest! {
    #[test]
    fn prop_snippet_is_bounded(text in ".{0,600}") {
        let snippet = domain_mail::snippet(Some(text.as_str()), None);
        prop_assert!(snippet.chars().count() <= 160);
    }

    #[test]
    fn prop_personalize_without_placeholder_is_identity(text in "[a-zA-Z ,.!]{0,80}") {
        prop_assert_eq!(personalize(&text, Some("Ann")), text);
    }
}
