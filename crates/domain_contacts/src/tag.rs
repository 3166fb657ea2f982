//! Tags
//!
//! Tags are tenant-defined labels. Names are unique per tenant ignoring case,
//! so "Volunteer" and "volunteer" are the same tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clean;
use crate::error::ContactError;

pub const MAX_TAG_NAME_LEN: usize = 64;

/// Editable fields of a tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInput {
    pub name: String,
    /// `#rrggbb`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TagInput {
    /// Trims the name, collapses inner whitespace and lowercases the color
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.split_whitespace().collect::<Vec<_>>().join(" "),
            color: clean(self.color).map(|c| c.to_lowercase()),
            description: clean(self.description),
        }
    }

    pub fn validate(&self) -> Result<(), ContactError> {
        let len = self.name.chars().count();
        if len == 0 {
            return Err(ContactError::invalid_tag("name is required"));
        }
        if len > MAX_TAG_NAME_LEN {
            return Err(ContactError::invalid_tag(format!(
                "name must be at most {} characters",
                MAX_TAG_NAME_LEN
            )));
        }
        if let Some(ref color) = self.color {
            if !is_hex_color(color) {
                return Err(ContactError::invalid_tag(format!(
                    "color '{}' is not of the form #rrggbb",
                    color
                )));
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// What kind of record a tag is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagTarget {
    Person,
    Household,
}

impl TagTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagTarget::Person => "person",
            TagTarget::Household => "household",
        }
    }
}

impl fmt::Display for TagTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagTarget {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" | "persons" => Ok(TagTarget::Person),
            "household" | "households" => Ok(TagTarget::Household),
            other => Err(ContactError::UnknownTarget(other.to_string())),
        }
    }
}
