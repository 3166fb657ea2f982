//! Password hashing and strength rules
//!
//! Hashes are argon2id PHC strings (`$argon2id$v=19$...`), so the salt and
//! parameters travel with the hash and can change without a migration.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

use crate::error::IdentityError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 256;

/// Rejects passwords shorter than 8 characters or lacking a letter or a digit
pub fn check_password_strength(password: &str) -> Result<(), IdentityError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword(format!(
            "must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword(format!(
            "must be at most {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(IdentityError::WeakPassword("must contain a letter".to_string()));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(IdentityError::WeakPassword("must contain a digit".to_string()));
    }
    Ok(())
}

/// Hashes a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Hashing(e.to_string()))
}

/// Checks a password against a stored hash.
///
/// A malformed stored hash counts as a mismatch and is logged.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            false
        }
    }
}

/// Checks a sign-in attempt against the account's hash, if there is one.
///
/// Without an account the password is run against a dummy hash and the
/// check fails, so both paths cost one argon2 verification.
pub fn verify_sign_in(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            verify_password(password, dummy_hash());
            false
        }
    }
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("no account behind this 0ne").unwrap_or_default())
}
