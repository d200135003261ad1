//! Graceful degradation: run the Pro path when licensed, otherwise fall
//! back to the free behaviour and tell the user why.
//!
//! Nothing here deletes or hides user data. A lapsed license only switches
//! which code path runs.

use crate::error::LicenseError;
use crate::gate::FeatureGate;
use crate::lifecycle::LicenseState;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Deref;
use tracing::info;

pub use crate::registry::feature_friendly_name;

/// Target used for user-facing degradation notices.
pub const NOTICE_TARGET: &str = "aios_pro::degradation";

/// Options for [`with_graceful_degradation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegradationOptions {
    /// Suppress the notice emitted when falling back.
    pub silent: bool,
}

impl DegradationOptions {
    #[must_use]
    pub fn silent() -> Self {
        Self { silent: true }
    }
}

fn notify_fallback(gate: &FeatureGate, feature_id: &str, options: DegradationOptions) {
    if options.silent {
        return;
    }
    let message = LicenseError::from(gate.unavailable(feature_id, None)).cli_message();
    info!(target: NOTICE_TARGET, feature = feature_id, "{}", message);
}

/// Runs `pro` if `feature_id` is available, else `fallback`. Exactly one of
/// the two closures is called.
pub fn with_graceful_degradation<T>(
    gate: &FeatureGate,
    feature_id: &str,
    pro: impl FnOnce() -> T,
    fallback: impl FnOnce() -> T,
    options: DegradationOptions,
) -> T {
    if gate.is_available(feature_id) {
        return pro();
    }
    notify_fallback(gate, feature_id, options);
    fallback()
}

/// Like [`with_graceful_degradation`] with no free alternative: `None` when
/// the feature is unavailable.
pub fn with_graceful_degradation_or_none<T>(
    gate: &FeatureGate,
    feature_id: &str,
    pro: impl FnOnce() -> T,
    options: DegradationOptions,
) -> Option<T> {
    with_graceful_degradation(gate, feature_id, || Some(pro()), || None, options)
}

/// Runs `action` only when `feature_id` is available. Never emits a notice.
pub fn if_pro_available<T>(
    gate: &FeatureGate,
    feature_id: &str,
    action: impl FnOnce() -> T,
) -> Option<T> {
    gate.is_available(feature_id).then(action)
}

/// Whether Pro features are currently off: no license, an expired one, or a
/// cache that cannot be trusted. Grace does not count as degraded.
pub fn is_in_degraded_mode(gate: &FeatureGate) -> bool {
    !gate.license_state().is_ok_and(|state| state.grants_access())
}

/// Why the CLI is (or is not) degraded, and what the user can do about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradationStatus {
    pub degraded: bool,
    pub reason: String,
    pub action: Option<String>,
}

pub fn degradation_status(gate: &FeatureGate) -> DegradationStatus {
    let config = gate.config();
    let activate = Some(config.activate_command.clone());
    match gate.license_state() {
        Ok(LicenseState::Active) => DegradationStatus {
            degraded: false,
            reason: format!("{} license is active", config.product_name),
            action: None,
        },
        Ok(LicenseState::Grace) => DegradationStatus {
            degraded: false,
            reason: "License is in its grace period. Re-validate to keep Pro features \
                     after it ends."
                .to_string(),
            action: Some(config.validate_command.clone()),
        },
        Ok(LicenseState::Expired) => DegradationStatus {
            degraded: true,
            reason: "License has expired. Pro features are disabled; your data is preserved."
                .to_string(),
            action: activate,
        },
        Ok(LicenseState::NotActivated) => DegradationStatus {
            degraded: true,
            reason: "No license activated".to_string(),
            action: activate,
        },
        Err(e) => DegradationStatus {
            degraded: true,
            reason: format!("License cache is invalid: {e}"),
            action: activate,
        },
    }
}

// ── Fallback wrappers ────────────────────────────────────────────

/// Error types that can signal "this Pro feature is gated off".
pub trait GateError {
    fn is_feature_unavailable(&self) -> bool;
}

impl GateError for LicenseError {
    fn is_feature_unavailable(&self) -> bool {
        matches!(self, LicenseError::FeatureUnavailable(_))
    }
}

impl GateError for anyhow::Error {
    fn is_feature_unavailable(&self) -> bool {
        self.downcast_ref::<LicenseError>()
            .is_some_and(|e| matches!(e, LicenseError::FeatureUnavailable(_)))
    }
}

/// Runs `call`; if it fails because a Pro feature is unavailable, returns
/// `fallback()` instead. Other errors pass through unchanged.
pub fn or_fallback<T, E: GateError>(
    call: impl FnOnce() -> Result<T, E>,
    fallback: impl FnOnce() -> T,
) -> Result<T, E> {
    match call() {
        Err(e) if e.is_feature_unavailable() => Ok(fallback()),
        other => other,
    }
}

type Fallback<T, R> = Box<dyn Fn(&T) -> R + Send + Sync>;

/// Wraps a service whose operations may be Pro-gated, with a table of named
/// free fallbacks.
///
/// ```ignore
/// let squads = DegradationWrapper::new(SquadService::new(&gate))
///     .with_fallback("list", |svc| svc.list_builtin());
/// let names = squads.invoke("list", |svc| svc.list_premium())?;
/// ```
pub struct DegradationWrapper<T, R> {
    target: T,
    fallbacks: HashMap<&'static str, Fallback<T, R>>,
}

impl<T, R> DegradationWrapper<T, R> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            fallbacks: HashMap::new(),
        }
    }

    /// Registers the fallback used for operation `name`.
    #[must_use]
    pub fn with_fallback(
        mut self,
        name: &'static str,
        fallback: impl Fn(&T) -> R + Send + Sync + 'static,
    ) -> Self {
        self.fallbacks.insert(name, Box::new(fallback));
        self
    }

    #[must_use]
    pub fn has_fallback(&self, name: &str) -> bool {
        self.fallbacks.contains_key(name)
    }

    /// Runs operation `name` on the target.
    ///
    /// A feature-unavailable error is replaced by the registered fallback's
    /// result; without a fallback, or for any other error, the error is
    /// returned as is.
    pub fn invoke<E: GateError>(
        &self,
        name: &str,
        call: impl FnOnce(&T) -> Result<R, E>,
    ) -> Result<R, E> {
        match call(&self.target) {
            Err(e) if e.is_feature_unavailable() => match self.fallbacks.get(name) {
                Some(fallback) => Ok(fallback(&self.target)),
                None => Err(e),
            },
            other => other,
        }
    }

    pub fn into_inner(self) -> T {
        self.target
    }
}

impl<T, R> Deref for DegradationWrapper<T, R> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.target
    }
}
