//! Absolute message deadlines

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Absolute deadline in milliseconds since the Unix epoch
///
/// A deadline is expired once `expiry <= now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpiryDate(u64);

impl ExpiryDate {
    pub const MAX: ExpiryDate = ExpiryDate(u64::MAX);

    pub fn from_absolute_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_relative_ttl(ttl: Duration) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        Self(now_millis().saturating_add(ttl_ms))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.0 <= now_ms
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining(&self) -> Option<Duration> {
        let now = now_millis();
        if self.is_expired_at(now) {
            None
        } else {
            Some(Duration::from_millis(self.0 - now))
        }
    }
}

impl fmt::Display for ExpiryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match i64::try_from(self.0)
            .ok()
            .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        {
            Some(time) => write!(f, "{}", time.format("%d/%m %H:%M:%S%.3f")),
            None => write!(f, "{}ms", self.0),
        }
    }
}
