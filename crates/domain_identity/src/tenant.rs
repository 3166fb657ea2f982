//! Tenant (customer organization)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::TenantId;
use crate::error::IdentityError;

/// Longest slug kept after normalization
const MAX_SLUG_LEN: usize = 63;

/// A customer organization; all other data hangs off its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates a tenant, deriving the slug from the name
    pub fn new(name: &str) -> Result<Self, IdentityError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::InvalidTenantName("name is required".to_string()));
        }
        if name.chars().count() > 200 {
            return Err(IdentityError::InvalidTenantName(
                "name must be at most 200 characters".to_string(),
            ));
        }
        let slug = slugify(name)?;
        let now = Utc::now();
        Ok(Self {
            id: TenantId::new_v7(),
            name: name.to_string(),
            slug,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Turns an organization name into a URL-safe slug.
///
/// ASCII letters and digits are kept (lowercased), every other run of
/// characters becomes a single `-`, and leading/trailing dashes are dropped.
pub fn slugify(name: &str) -> Result<String, IdentityError> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        return Err(IdentityError::InvalidTenantName(format!(
            "'{}' contains no letters or digits",
            name
        )));
    }
    Ok(slug)
}
