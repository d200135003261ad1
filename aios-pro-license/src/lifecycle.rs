//! License lifecycle, derived from a cached record and the current time.
//!
//! ```text
//! activatedAt ── cacheValidDays ──▶ cacheExpiresAt ── gracePeriodDays ──▶ graceEndsAt
//!      │            Active                │              Grace                 │  Expired
//! ```

use crate::record::LicenseRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a license stands at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseState {
    #[serde(rename = "Not Activated")]
    NotActivated,
    Active,
    /// Cache validity has lapsed but features stay on until grace ends.
    Grace,
    Expired,
}

impl LicenseState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotActivated => "Not Activated",
            Self::Active => "Active",
            Self::Grace => "Grace",
            Self::Expired => "Expired",
        }
    }

    /// Whether Pro features are accessible in this state.
    #[must_use]
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Grace)
    }
}

impl fmt::Display for LicenseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End of the cache validity window. Saturates at the latest representable
/// time, so a window too long to represent never lapses.
#[must_use]
pub fn cache_expires_at(record: &LicenseRecord) -> DateTime<Utc> {
    add_days(record.activated_at, record.cache_valid_days)
}

/// End of the grace period, after which the license is expired.
#[must_use]
pub fn grace_ends_at(record: &LicenseRecord) -> DateTime<Utc> {
    add_days(cache_expires_at(record), record.grace_period_days)
}

fn add_days(start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    start
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[must_use]
pub fn state_at(record: Option<&LicenseRecord>, now: DateTime<Utc>) -> LicenseState {
    let Some(record) = record else {
        return LicenseState::NotActivated;
    };
    if now <= cache_expires_at(record) {
        LicenseState::Active
    } else if now <= grace_ends_at(record) {
        LicenseState::Grace
    } else {
        LicenseState::Expired
    }
}

/// True once the cache validity window has passed, including during grace.
/// Compare [`LicenseState::Expired`], which is only reached after grace ends.
#[must_use]
pub fn is_expired(record: &LicenseRecord, now: DateTime<Utc>) -> bool {
    now > cache_expires_at(record)
}

#[must_use]
pub fn is_in_grace_period(record: &LicenseRecord, now: DateTime<Utc>) -> bool {
    state_at(Some(record), now) == LicenseState::Grace
}

/// Whole days until the cache expires; negative once it has.
#[must_use]
pub fn days_remaining(record: &LicenseRecord, now: DateTime<Utc>) -> i64 {
    (cache_expires_at(record) - now).num_days()
}
