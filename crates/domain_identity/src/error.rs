//! Identity domain errors

use thiserror::Error;

/// Errors raised by identity rules
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Email/password pair did not match; deliberately does not say which
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User account is disabled")]
    InactiveUser,

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Invalid organization name: {0}")]
    InvalidTenantName(String),

    #[error("Invalid profile data: {0}")]
    InvalidProfile(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Role {0} cannot be assigned here")]
    RoleNotAssignable(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl IdentityError {
    /// True for errors caused by caller input rather than credentials
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IdentityError::InvalidEmail(_)
                | IdentityError::WeakPassword(_)
                | IdentityError::InvalidTenantName(_)
                | IdentityError::InvalidProfile(_)
                | IdentityError::UnknownRole(_)
                | IdentityError::RoleNotAssignable(_)
        )
    }
}
