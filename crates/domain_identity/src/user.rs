//! Auth users and roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::ValidateEmail;

use crate::error::IdentityError;
use crate::password::check_password_strength;

/// Role of a user inside its tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Created the tenant; can do everything
    Owner,
    /// Manages members and sends newsletters
    Admin,
    /// Works with contacts and mail
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Owners and admins manage the tenant
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    pub fn can_invite(&self) -> bool {
        self.is_admin()
    }

    pub fn can_send_newsletters(&self) -> bool {
        self.is_admin()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(IdentityError::UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Trims and lowercases an email address, rejecting malformed ones
pub fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(IdentityError::InvalidEmail(email));
    }
    Ok(email)
}

/// A user invited into an existing tenant by an owner or admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl NewMember {
    /// Checks the invitation and returns the normalized email.
    ///
    /// Only `admin` and `member` can be handed out; a tenant has one owner.
    pub fn validate(&self) -> Result<String, IdentityError> {
        let email = normalize_email(&self.email)?;
        check_password_strength(&self.password)?;
        if self.role == Role::Owner {
            return Err(IdentityError::RoleNotAssignable(Role::Owner.to_string()));
        }
        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            return Err(IdentityError::InvalidProfile("a first or last name is required".to_string()));
        }
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Owner, Role::Admin, Role::Member] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Owner.can_send_newsletters());
        assert!(Role::Admin.can_invite());
        assert!(!Role::Member.can_invite());
        assert!(!Role::Member.can_send_newsletters());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.ORG ").unwrap(), "jane@example.org");
        assert!(normalize_email("not-an-email").is_err());
    }

    #[test]
    fn test_owner_cannot_be_invited() {
        let member = NewMember {
            email: "second@example.org".to_string(),
            password: "correct horse 9".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Lee".to_string(),
            role: Role::Owner,
        };
        assert!(matches!(member.validate(), Err(IdentityError::RoleNotAssignable(_))));
    }
}
