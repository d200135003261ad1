//! Licensing for AIOS Pro.
//!
//! This module handles:
//! - The encrypted, machine-bound license cache ([`LicenseCacheStore`])
//! - Lifecycle state from the cached activation (Active, Grace, Expired)
//! - Feature gating against license patterns ([`FeatureGate`])
//! - Graceful degradation to free behaviour ([`with_graceful_degradation`],
//!   [`DegradationWrapper`])
//!
//! # Design Principles
//!
//! - **Offline at run time**: activation talks to the license server once;
//!   everything here works from the local cache
//! - **Never lose data**: a lapsed license disables Pro code paths, nothing
//!   else
//! - **Never leak the key**: records hold only the masked key and errors
//!   never include one
//!
//! # Example
//!
//! ```no_run
//! use aios_pro_license::{FeatureGate, LicenseCacheStore};
//!
//! let gate = FeatureGate::new(LicenseCacheStore::new("."));
//! if gate.is_available("pro.squads.premium") {
//!     // premium squads
//! }
//! gate.require("pro.memory.extended", None)?;
//! # Ok::<(), aios_pro_license::LicenseError>(())
//! ```

mod clock;
mod config;
mod degradation;
mod error;
mod gate;
mod lifecycle;
mod record;
mod registry;
mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    LicenseConfig, DEFAULT_ACTIVATE_COMMAND, DEFAULT_CACHE_DIR_NAME, DEFAULT_CACHE_FILE_NAME,
    DEFAULT_PRODUCT_NAME, DEFAULT_PURCHASE_URL, DEFAULT_VALIDATE_COMMAND,
};
pub use degradation::{
    degradation_status, feature_friendly_name, if_pro_available, is_in_degraded_mode,
    or_fallback, with_graceful_degradation, with_graceful_degradation_or_none,
    DegradationOptions, DegradationStatus, DegradationWrapper, GateError, NOTICE_TARGET,
};
pub use error::{
    ActivationCode, ActivationDetails, ActivationFailure, ErrorReport, FeatureUnavailable,
    LicenseError, LicenseResult, ValidationCode, ValidationFailure,
};
pub use gate::{FeatureGate, FeatureStatus, LicenseInfo};
pub use lifecycle::{
    cache_expires_at, days_remaining, grace_ends_at, is_expired, is_in_grace_period, state_at,
    LicenseState,
};
pub use record::{
    LicenseRecord, PendingDeactivation, Seats, DEFAULT_CACHE_VALID_DAYS,
    DEFAULT_GRACE_PERIOD_DAYS,
};
pub use registry::{lookup, matches_any, pattern_matches, FeatureRegistryEntry, FEATURE_REGISTRY};
pub use store::{LicenseCacheStore, CACHE_VERSION, PENDING_DEACTIVATION_FILE};
