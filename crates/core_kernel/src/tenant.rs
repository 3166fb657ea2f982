//! Tenant scoping
//!
//! Every repository call receives a [`TenantContext`]. Rows are only ever
//! read or written inside the tenant the caller authenticated into.

use serde::{Deserialize, Serialize};

use crate::identifiers::{TenantId, UserId};

/// The tenant and user an operation runs on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId, user_id: UserId) -> Self {
        Self { tenant_id, user_id }
    }

    /// Returns true if a row owned by `tenant_id` is visible to this context
    pub fn owns(&self, tenant_id: TenantId) -> bool {
        self.tenant_id == tenant_id
    }
}
