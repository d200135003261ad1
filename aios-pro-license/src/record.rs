//! The cached license record and the offline deactivation marker.

use aios_pro_crypto::mask_key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Days a cached activation stays valid without re-validation.
pub const DEFAULT_CACHE_VALID_DAYS: u32 = 30;

/// Extra days of full access after the cache validity window closes.
pub const DEFAULT_GRACE_PERIOD_DAYS: u32 = 7;

/// Seat usage reported by the license server at activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seats {
    pub used: u32,
    pub max: u32,
}

impl Seats {
    #[must_use]
    pub fn new(used: u32, max: u32) -> Self {
        Self { used, max }
    }
}

/// A license activation as cached on this machine.
///
/// Only the masked form of the key is ever held; [`LicenseRecord::new`]
/// masks whatever it is given and deserialization re-masks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    #[serde(deserialize_with = "deserialize_masked")]
    key: String,
    pub activated_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Feature patterns, e.g. `pro.squads.*` or `pro.memory`.
    pub features: Vec<String>,
    #[serde(default)]
    pub seats: Seats,
    #[serde(default = "default_cache_valid_days")]
    pub cache_valid_days: u32,
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,
}

fn default_cache_valid_days() -> u32 {
    DEFAULT_CACHE_VALID_DAYS
}

fn default_grace_period_days() -> u32 {
    DEFAULT_GRACE_PERIOD_DAYS
}

fn deserialize_masked<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let key = String::deserialize(deserializer)?;
    Ok(mask_key(Some(&key)))
}

impl LicenseRecord {
    /// Builds a record from a freshly activated key. The key is masked here.
    pub fn new(
        raw_key: &str,
        features: Vec<String>,
        seats: Seats,
        activated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: mask_key(Some(raw_key)),
            activated_at,
            expires_at: None,
            features,
            seats,
            cache_valid_days: DEFAULT_CACHE_VALID_DAYS,
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
        }
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn with_cache_valid_days(mut self, days: u32) -> Self {
        self.cache_valid_days = days;
        self
    }

    #[must_use]
    pub fn with_grace_period_days(mut self, days: u32) -> Self {
        self.grace_period_days = days;
        self
    }

    /// The masked license key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A deactivation performed while offline, waiting to be reported to the
/// license server so the seat is released.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeactivation {
    /// Raw key; the server needs it to release the seat.
    pub license_key: String,
    pub machine_id: String,
    pub deactivated_at: DateTime<Utc>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for PendingDeactivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDeactivation")
            .field("license_key", &mask_key(Some(&self.license_key)))
            .field("machine_id", &self.machine_id)
            .field("deactivated_at", &self.deactivated_at)
            .field("synced", &self.synced)
            .field("synced_at", &self.synced_at)
            .finish()
    }
}
