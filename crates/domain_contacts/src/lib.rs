//! Contacts Domain
//!
//! Persons, the households they live in, and the tags used to segment both.
//!
//! # Model
//!
//! - **Person**: an individual contact (voter, donor, volunteer, ...)
//! - **Household**: a postal address shared by zero or more persons
//! - **Tag**: a tenant-defined label attached to persons or households
//!
//! Inputs are normalized (trimmed, blank strings dropped, emails lowercased)
//! before validation, so the database only ever sees canonical values.
//!
//! # Examples
//!
//! ```rust
//! use domain_contacts::person::PersonInput;
//! use domain_contacts::validation::ContactValidator;
//!
//! let person = PersonInput {
//!     first_name: " Fannie ".to_string(),
//!     last_name: "Hamer".to_string(),
//!     email: Some("FANNIE@example.org".to_string()),
//!     ..Default::default()
//! }
//! .normalized();
//!
//! assert_eq!(person.email.as_deref(), Some("fannie@example.org"));
//! assert!(ContactValidator::validate_person(&person).is_valid);
//! ```

pub mod person;
pub mod household;
pub mod tag;
pub mod validation;
pub mod error;

pub use person::PersonInput;
pub use household::HouseholdInput;
pub use tag::{TagInput, TagTarget};
pub use validation::{ContactValidator, ValidationResult};
pub use error::ContactError;

/// Trims a string and turns blank values into `None`
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
