//! Sign-up and sign-in requests

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::password::check_password_strength;
use crate::tenant::Tenant;
use crate::user::normalize_email;

/// Everything needed to open a new tenant with its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUp {
    pub organization_name: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// A sign-up that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedSignUp {
    pub tenant: Tenant,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl SignUp {
    /// Validates the request and derives the tenant to create
    pub fn validate(self) -> Result<ValidatedSignUp, IdentityError> {
        let tenant = Tenant::new(&self.organization_name)?;
        let email = normalize_email(&self.email)?;
        check_password_strength(&self.password)?;

        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        if first_name.is_empty() && last_name.is_empty() {
            return Err(IdentityError::InvalidProfile("a first or last name is required".to_string()));
        }

        Ok(ValidatedSignUp {
            tenant,
            email,
            password: self.password,
            first_name,
            last_name,
        })
    }
}

/// Credentials presented at sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

impl SignIn {
    /// Normalized lookup key; a malformed address can never match a user
    pub fn lookup_email(&self) -> Result<String, IdentityError> {
        normalize_email(&self.email).map_err(|_| IdentityError::InvalidCredentials)
    }
}
