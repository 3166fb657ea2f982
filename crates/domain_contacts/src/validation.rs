//! Contact validation rules
//!
//! # Validation Rules
//!
//! ## Persons
//! - Must have a first name or a last name
//! - Email must be a valid address (if provided)
//! - Phone must contain 7 to 15 digits and only dialing characters
//! - Date of birth cannot be in the future, age must be below 130
//!
//! ## Households
//! - Must have a name
//! - Country must be a 2-letter code (if provided)
//! - Phone follows the person rules

use chrono::{Datelike, Utc};
use validator::ValidateEmail;

use crate::error::ContactError;
use crate::household::HouseholdInput;
use crate::person::PersonInput;

const MAX_AGE_YEARS: i32 = 130;
const MAX_NAME_LEN: usize = 100;

/// Result of contact validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the contact is valid
    pub is_valid: bool,
    /// List of validation errors
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Creates a successful validation result
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Adds an error to the result
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Converts into a `Result` carrying every error
    pub fn into_result(self) -> Result<(), ContactError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(ContactError::validation_failed(self.errors))
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Validator for contact inputs
///
/// Inputs should be normalized first; the validator does not trim.
pub struct ContactValidator;

impl ContactValidator {
    /// Validates a person
    pub fn validate_person(person: &PersonInput) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if person.first_name.is_empty() && person.last_name.is_empty() {
            result.add_error("A first name or last name is required");
        }
        for (field, value) in [
            ("first_name", Some(person.first_name.as_str())),
            ("middle_name", person.middle_name.as_deref()),
            ("last_name", Some(person.last_name.as_str())),
        ] {
            if value.map(|v| v.chars().count() > MAX_NAME_LEN).unwrap_or(false) {
                result.add_error(format!("{} must be at most {} characters", field, MAX_NAME_LEN));
            }
        }

        if let Some(ref email) = person.email {
            Self::check_email(email, &mut result);
        }
        if let Some(ref phone) = person.phone {
            Self::check_phone(phone, &mut result);
        }

        if let Some(dob) = person.date_of_birth {
            let today = Utc::now().date_naive();
            if dob > today {
                result.add_error("Date of birth cannot be in the future");
            } else if today.year() - dob.year() > MAX_AGE_YEARS {
                result.add_error(format!("Invalid date of birth: {}", dob));
            }
        }

        result
    }

    /// Validates a household
    pub fn validate_household(household: &HouseholdInput) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if household.name.is_empty() {
            result.add_error("Household name is required");
        } else if household.name.chars().count() > 200 {
            result.add_error("Household name must be at most 200 characters");
        }

        if let Some(ref country) = household.country {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                result.add_error("Country should be a 2-letter ISO country code");
            }
        }
        if let Some(ref phone) = household.phone {
            Self::check_phone(phone, &mut result);
        }

        result
    }

    fn check_email(email: &str, result: &mut ValidationResult) {
        if !email.validate_email() {
            result.add_error(format!("Invalid email format: {}", email));
        }
    }

    fn check_phone(phone: &str, result: &mut ValidationResult) {
        let allowed = |c: char| c.is_ascii_digit() || " +-().".contains(c);
        if !phone.chars().all(allowed) {
            result.add_error(format!("Phone number contains invalid characters: {}", phone));
            return;
        }
        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        if !(7..=15).contains(&digits) {
            result.add_error(format!("Phone number must have 7 to 15 digits: {}", phone));
        }
    }
}
