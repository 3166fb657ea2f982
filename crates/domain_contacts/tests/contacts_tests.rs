//! Tests for the contacts domain

use domain_contacts::{ContactValidator, HouseholdInput, PersonInput, TagInput, TagTarget, ValidationResult};
use proptest::prelude::*;

mod person_tests {
    use super::*;

    #[test]
    fn test_normalize_then_validate() {
        let input = PersonInput {
            first_name: "  ".to_string(),
            last_name: " Lewis ".to_string(),
            email: Some("  JOHN@Example.com".to_string()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(input.last_name, "Lewis");
        let result = ContactValidator::validate_person(&input);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_invalid_email_is_reported() {
        let input = PersonInput {
            first_name: "John".to_string(),
            email: Some("john@".to_string()),
            ..Default::default()
        };
        let result = ContactValidator::validate_person(&input);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("Invalid email"));
    }

    #[test]
    fn test_person_json_defaults() {
        let input: PersonInput = serde_json::from_str(r#"{"first_name":"Bayard"}"#).unwrap();
        assert_eq!(input.first_name, "Bayard");
        assert!(!input.do_not_contact);
        assert!(input.household_id.is_none());
    }
}

mod household_tests {
    use super::*;

    #[test]
    fn test_country_uppercased_before_validation() {
        let input = HouseholdInput {
            name: "Rustin Residence".to_string(),
            country: Some("us".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(input.country.as_deref(), Some("US"));
        assert!(ContactValidator::validate_household(&input).is_valid);
    }
}

mod tag_tests {
    use super::*;

    #[test]
    fn test_tag_json() {
        let tag: TagInput = serde_json::from_str(r##"{"name":"Donor","color":"#00FF00"}"##).unwrap();
        let tag = tag.normalized();
        assert_eq!(tag.color.as_deref(), Some("#00ff00"));
        assert!(tag.validate().is_ok());
    }

    #[test]
    fn test_target_display() {
        assert_eq!(TagTarget::Household.to_string(), "household");
    }
}

mod validation_result_tests {
    use super::*;
    use domain_contacts::ContactError;

    #[test]
    fn test_into_result_keeps_every_error() {
        let mut result = ValidationResult::ok();
        result.add_error("bad");
        result.add_error("worse");
        assert!(!result.is_valid);

        match result.into_result() {
            Err(ContactError::ValidationFailed(errors)) => assert_eq!(errors, "bad; worse"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(ValidationResult::ok().into_result().is_ok());
    }
}

proptest! {
    #[test]
    fn phones_with_valid_digit_counts_pass(digits in "[0-9]{7,15}") {
        let input = PersonInput {
            first_name: "Test".to_string(),
            phone: Some(digits),
            ..Default::default()
        };
        prop_assert!(ContactValidator::validate_person(&input).is_valid);
    }

    #[test]
    fn normalized_tag_names_have_no_outer_whitespace(name in "[ a-zA-Z]{0,40}") {
        let tag = TagInput { name, color: None, description: None }.normalized();
        prop_assert_eq!(tag.name.trim(), tag.name.as_str());
        prop_assert!(!tag.name.contains("  "));
    }
}
