//! Tests for sign-up, sign-in and password rules

use domain_identity::signup::{SignIn, SignUp};
use domain_identity::{hash_password, verify_password, IdentityError, Role};
use proptest::prelude::*;

fn sign_up() -> SignUp {
    SignUp {
        organization_name: "Northside Tenants Union".to_string(),
        email: " Organizer@Northside.org ".to_string(),
        password: "solidarity2024".to_string(),
        first_name: " Rosa ".to_string(),
        last_name: "Parks".to_string(),
    }
}

mod sign_up_tests {
    use super::*;

    #[test]
    fn test_valid_sign_up() {
        let validated = sign_up().validate().unwrap();

        assert_eq!(validated.tenant.slug, "northside-tenants-union");
        assert_eq!(validated.email, "organizer@northside.org");
        assert_eq!(validated.first_name, "Rosa");
    }

    #[test]
    fn test_rejects_weak_password() {
        let request = SignUp {
            password: "short".to_string(),
            ..sign_up()
        };
        assert!(matches!(request.validate(), Err(IdentityError::WeakPassword(_))));
    }

    #[test]
    fn test_rejects_bad_email() {
        let request = SignUp {
            email: "organizer-at-northside".to_string(),
            ..sign_up()
        };
        let err = request.validate().unwrap_err();
        assert!(matches!(err, IdentityError::InvalidEmail(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_rejects_blank_organization() {
        let request = SignUp {
            organization_name: "   ".to_string(),
            ..sign_up()
        };
        assert!(matches!(request.validate(), Err(IdentityError::InvalidTenantName(_))));
    }

    #[test]
    fn test_requires_a_name() {
        let request = SignUp {
            first_name: " ".to_string(),
            last_name: "".to_string(),
            ..sign_up()
        };
        assert!(matches!(request.validate(), Err(IdentityError::InvalidProfile(_))));
    }
}

mod sign_in_tests {
    use super::*;

    #[test]
    fn test_malformed_email_is_invalid_credentials() {
        let sign_in = SignIn {
            email: "nope".to_string(),
            password: "whatever1".to_string(),
        };
        assert!(matches!(sign_in.lookup_email(), Err(IdentityError::InvalidCredentials)));
    }

    #[test]
    fn test_lookup_email_is_normalized() {
        let sign_in = SignIn {
            email: "ME@Example.com".to_string(),
            password: "whatever1".to_string(),
        };
        assert_eq!(sign_in.lookup_email().unwrap(), "me@example.com");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn hashed_passwords_verify_only_themselves(password in "[a-z]{6,12}[0-9]{2}") {
        let hash = hash_password(&password).unwrap();
        prop_assert!(verify_password(&password, &hash));
        let other = format!("{}x", password);
        prop_assert!(!verify_password(&other, &hash));
    }
}
