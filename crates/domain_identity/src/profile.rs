//! User profiles

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

const MAX_NAME_LEN: usize = 100;
const MAX_SIGNATURE_LEN: usize = 4000;

/// Builds a display name from first and last name
pub fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim()).trim().to_string()
}

/// Partial profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: Option<String>,
    pub signature: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.display_name.is_none()
            && self.avatar_url.is_none()
            && self.timezone.is_none()
            && self.signature.is_none()
    }

    pub fn validate(&self) -> Result<(), IdentityError> {
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("display_name", &self.display_name),
        ] {
            if let Some(value) = value {
                if value.chars().count() > MAX_NAME_LEN {
                    return Err(IdentityError::InvalidProfile(format!(
                        "{} must be at most {} characters",
                        field, MAX_NAME_LEN
                    )));
                }
            }
        }
        if let Some(ref display_name) = self.display_name {
            if display_name.trim().is_empty() {
                return Err(IdentityError::InvalidProfile("display_name cannot be blank".to_string()));
            }
        }
        if let Some(ref url) = self.avatar_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(IdentityError::InvalidProfile(
                    "avatar_url must be an http(s) URL".to_string(),
                ));
            }
        }
        if let Some(ref timezone) = self.timezone {
            if timezone.trim().is_empty() || timezone.contains(char::is_whitespace) {
                return Err(IdentityError::InvalidProfile(format!("invalid timezone '{}'", timezone)));
            }
        }
        if let Some(ref signature) = self.signature {
            if signature.chars().count() > MAX_SIGNATURE_LEN {
                return Err(IdentityError::InvalidProfile("signature is too long".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Ada", "Lovelace"), "Ada Lovelace");
        assert_eq!(display_name("", "Lovelace"), "Lovelace");
    }

    #[test]
    fn test_update_validation() {
        assert!(ProfileUpdate::default().validate().is_ok());
        assert!(ProfileUpdate::default().is_empty());

        let bad_url = ProfileUpdate {
            avatar_url: Some("ftp://x".to_string()),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let bad_tz = ProfileUpdate {
            timezone: Some("America/New York".to_string()),
            ..Default::default()
        };
        assert!(bad_tz.validate().is_err());

        let ok = ProfileUpdate {
            timezone: Some("America/Chicago".to_string()),
            display_name: Some("Coach".to_string()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }
}
