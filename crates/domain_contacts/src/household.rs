//! Households
//!
//! A household groups persons sharing an address. Deleting a household
//! detaches its members; it never deletes them.

use serde::{Deserialize, Serialize};

use crate::clean;

/// Editable fields of a household
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdInput {
    pub name: String,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// State, province or county
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl HouseholdInput {
    /// Trims every text field, drops blanks and uppercases the country code
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            address_line1: clean(self.address_line1),
            address_line2: clean(self.address_line2),
            city: clean(self.city),
            region: clean(self.region),
            postal_code: clean(self.postal_code).map(|p| p.to_uppercase()),
            country: clean(self.country).map(|c| c.to_uppercase()),
            phone: clean(self.phone),
            notes: clean(self.notes),
        }
    }

    /// Single-line mailing address, skipping missing parts
    pub fn mailing_address(&self) -> Option<String> {
        let locality = [self.city.as_deref(), self.region.as_deref(), self.postal_code.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let parts: Vec<&str> = [
            self.address_line1.as_deref(),
            self.address_line2.as_deref(),
            Some(locality.as_str()).filter(|l| !l.is_empty()),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
