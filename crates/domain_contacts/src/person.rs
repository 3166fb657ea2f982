//! Person contacts
//!
//! A person is the core record of the CRM. Creating and updating both take a
//! full [`PersonInput`]; an update replaces every editable field.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::HouseholdId;
use crate::clean;

/// Editable fields of a person
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonInput {
    #[serde(default)]
    pub household_id: Option<HouseholdId>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Registered party or political leaning, free text
    #[serde(default)]
    pub party_affiliation: Option<String>,
    /// Identifier from the voter file
    #[serde(default)]
    pub voter_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Excluded from newsletters and outreach
    #[serde(default)]
    pub do_not_contact: bool,
}

impl PersonInput {
    /// Trims every text field, drops blanks and lowercases the email
    pub fn normalized(self) -> Self {
        Self {
            household_id: self.household_id,
            first_name: self.first_name.trim().to_string(),
            middle_name: clean(self.middle_name),
            last_name: self.last_name.trim().to_string(),
            email: clean(self.email).map(|e| e.to_lowercase()),
            phone: clean(self.phone),
            date_of_birth: self.date_of_birth,
            party_affiliation: clean(self.party_affiliation),
            voter_id: clean(self.voter_id),
            notes: clean(self.notes),
            do_not_contact: self.do_not_contact,
        }
    }

    /// "First Middle Last" with blanks skipped
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Whether newsletters may be sent to this person
    pub fn is_reachable_by_email(&self) -> bool {
        !self.do_not_contact && self.email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized() {
        let person = PersonInput {
            first_name: "  Ella ".to_string(),
            middle_name: Some("   ".to_string()),
            last_name: "Baker".to_string(),
            email: Some(" Ella@SNCC.org ".to_string()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(person.first_name, "Ella");
        assert_eq!(person.middle_name, None);
        assert_eq!(person.email.as_deref(), Some("ella@sncc.org"));
    }

    #[test]
    fn test_full_name() {
        let person = PersonInput {
            first_name: "Martin".to_string(),
            middle_name: Some("Luther".to_string()),
            last_name: "King".to_string(),
            ..Default::default()
        };
        assert_eq!(person.full_name(), "Martin Luther King");

        let last_only = PersonInput {
            last_name: "Chavez".to_string(),
            ..Default::default()
        };
        assert_eq!(last_only.full_name(), "Chavez");
    }

    #[test]
    fn test_reachability() {
        let mut person = PersonInput {
            email: Some("a@b.org".to_string()),
            ..Default::default()
        };
        assert!(person.is_reachable_by_email());
        person.do_not_contact = true;
        assert!(!person.is_reachable_by_email());
    }
}
