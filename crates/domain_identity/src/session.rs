//! Session lifetime rules

use chrono::{DateTime, Duration, Utc};

/// Sessions last a week unless configured otherwise
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Decides when sessions expire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    ttl_secs: u64,
}

impl SessionPolicy {
    pub fn new(ttl_secs: u64) -> Self {
        Self { ttl_secs: ttl_secs.max(60) }
    }

    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs as i64)
    }

    /// Expiry for a session started at `now`
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl()
    }

    pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expires_at <= now
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL_SECS)
    }
}
