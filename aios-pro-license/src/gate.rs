//! Runtime feature gating.
//!
//! [`FeatureGate`] loads the license cache once, keeps the decrypted record
//! (or the reason it could not be loaded) in memory and answers availability
//! queries against it. Lifecycle state is recomputed from the injected clock
//! on every query, so a long-running process moves from Active to Grace to
//! Expired without reloading.

use crate::clock::{Clock, SystemClock};
use crate::config::LicenseConfig;
use crate::error::{FeatureUnavailable, LicenseError, LicenseResult};
use crate::lifecycle::{self, LicenseState};
use crate::record::{LicenseRecord, Seats};
use crate::registry::{self, FeatureRegistryEntry, FEATURE_REGISTRY};
use crate::store::LicenseCacheStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

type Loaded = Result<Option<Arc<LicenseRecord>>, LicenseError>;

/// A registry feature annotated with its current availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureStatus {
    pub id: String,
    pub name: String,
    pub description: String,
    pub module: String,
    pub available: bool,
}

/// Status summary of the active license, for `aios pro status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub state: LicenseState,
    /// Masked key.
    pub key: String,
    pub features: Vec<String>,
    pub seats: Seats,
    pub activated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub cache_expires_at: DateTime<Utc>,
    pub days_remaining: i64,
    pub in_grace: bool,
    /// Grace has ended and features are off. Unlike
    /// [`is_expired`](crate::is_expired), this stays false during grace.
    pub is_expired: bool,
}

/// Answers "may this Pro feature run?" for one project directory.
pub struct FeatureGate {
    store: LicenseCacheStore,
    config: LicenseConfig,
    clock: Arc<dyn Clock>,
    registry: &'static [FeatureRegistryEntry],
    loaded: RwLock<Option<Loaded>>,
}

impl std::fmt::Debug for FeatureGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureGate")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FeatureGate {
    /// Gate over `store` with default wording and the system clock.
    pub fn new(store: LicenseCacheStore) -> Self {
        Self {
            store,
            config: LicenseConfig::default(),
            clock: Arc::new(SystemClock),
            registry: FEATURE_REGISTRY,
            loaded: RwLock::new(None),
        }
    }

    /// Gate for the project at `target_dir`, laid out and worded per `config`.
    pub fn open(target_dir: impl AsRef<Path>, config: LicenseConfig) -> Self {
        let store = LicenseCacheStore::with_config(target_dir, &config);
        Self::new(store).with_config(config)
    }

    #[must_use]
    pub fn with_config(mut self, config: LicenseConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: &'static [FeatureRegistryEntry]) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn store(&self) -> &LicenseCacheStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &LicenseConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Drops the in-memory record; the next query re-reads the cache.
    pub fn reload(&self) {
        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("License gate reset, cache will be re-read on next query");
    }

    fn snapshot(&self) -> Loaded {
        if let Some(loaded) = self
            .loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return loaded.clone();
        }

        let mut slot = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(loaded) = slot.as_ref() {
            return loaded.clone();
        }
        let loaded = match self.store.read() {
            Ok(record) => Ok(record.map(Arc::new)),
            Err(e) => {
                warn!(
                    "License cache at {:?} is not usable ({}): {}",
                    self.store.cache_path(),
                    e.code(),
                    e
                );
                Err(e)
            }
        };
        *slot = Some(loaded.clone());
        loaded
    }

    fn grants(&self, record: &LicenseRecord, now: DateTime<Utc>, feature_id: &str) -> bool {
        lifecycle::state_at(Some(record), now).grants_access()
            && registry::matches_any(&record.features, feature_id)
    }

    /// Whether `feature_id` may run right now. False for an invalid cache.
    pub fn is_available(&self, feature_id: &str) -> bool {
        match self.snapshot() {
            Ok(Some(record)) => self.grants(&record, self.clock.now(), feature_id),
            Ok(None) | Err(_) => false,
        }
    }

    /// Succeeds when `feature_id` may run.
    ///
    /// Fails with [`LicenseError::FeatureUnavailable`] otherwise, or with the
    /// cache's [`LicenseError::Validation`] error if it could not be loaded.
    pub fn require(&self, feature_id: &str, friendly_name: Option<&str>) -> LicenseResult<()> {
        let record = self.snapshot()?;
        if record.is_some_and(|r| self.grants(&r, self.clock.now(), feature_id)) {
            return Ok(());
        }
        Err(self.unavailable(feature_id, friendly_name).into())
    }

    /// The error returned when `feature_id` is gated off.
    #[must_use]
    pub fn unavailable(&self, feature_id: &str, friendly_name: Option<&str>) -> FeatureUnavailable {
        let registry_name = self
            .registry
            .iter()
            .find(|e| e.id == feature_id)
            .map(|e| e.name);
        FeatureUnavailable::with_config(feature_id, friendly_name.or(registry_name), &self.config)
    }

    /// Ids of the registered features available now, sorted.
    pub fn list_available(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .list_all()
            .into_iter()
            .filter(|f| f.available)
            .map(|f| f.id)
            .collect();
        ids.sort();
        ids
    }

    /// Every registered feature with its current availability.
    pub fn list_all(&self) -> Vec<FeatureStatus> {
        let record = self.snapshot().ok().flatten();
        let now = self.clock.now();
        self.registry
            .iter()
            .map(|entry| FeatureStatus {
                id: entry.id.to_string(),
                name: entry.name.to_string(),
                description: entry.description.to_string(),
                module: entry.module.to_string(),
                available: record
                    .as_deref()
                    .is_some_and(|r| self.grants(r, now, entry.id)),
            })
            .collect()
    }

    /// [`list_all`](Self::list_all) grouped by module.
    pub fn list_by_module(&self) -> BTreeMap<String, Vec<FeatureStatus>> {
        let mut modules: BTreeMap<String, Vec<FeatureStatus>> = BTreeMap::new();
        for status in self.list_all() {
            modules.entry(status.module.clone()).or_default().push(status);
        }
        modules
    }

    pub fn license_state(&self) -> LicenseResult<LicenseState> {
        let record = self.snapshot()?;
        Ok(lifecycle::state_at(record.as_deref(), self.clock.now()))
    }

    /// Status summary, `None` when no license is activated.
    pub fn license_info(&self) -> LicenseResult<Option<LicenseInfo>> {
        let Some(record) = self.snapshot()? else {
            return Ok(None);
        };
        let now = self.clock.now();
        let state = lifecycle::state_at(Some(&*record), now);
        Ok(Some(LicenseInfo {
            state,
            key: record.key().to_string(),
            features: record.features.clone(),
            seats: record.seats,
            activated_at: record.activated_at,
            expires_at: record.expires_at,
            cache_expires_at: lifecycle::cache_expires_at(&record),
            days_remaining: lifecycle::days_remaining(&record, now),
            in_grace: state == LicenseState::Grace,
            is_expired: state == LicenseState::Expired,
        }))
    }
}
