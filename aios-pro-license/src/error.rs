//! Error types for the licensing module.
//!
//! Every failure a caller can see is one of three kinds, plus storage I/O on
//! writes. Each kind carries its own payload struct and renders to three
//! projections: `Display` (one-line message), [`LicenseError::cli_message`]
//! and [`LicenseError::report`]. None of them ever contain a raw license key.

use crate::config::{
    DEFAULT_ACTIVATE_COMMAND, DEFAULT_PRODUCT_NAME, DEFAULT_PURCHASE_URL, LicenseConfig,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseError {
    /// A Pro feature was requested without a usable license.
    #[error("{0}")]
    FeatureUnavailable(FeatureUnavailable),

    /// Activation against the license server failed.
    #[error("{0}")]
    Activation(ActivationFailure),

    /// The local license cache could not be trusted.
    #[error("{0}")]
    Validation(ValidationFailure),

    /// Writing or deleting a cache file failed.
    #[error("license storage error: {0}")]
    Storage(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

impl From<FeatureUnavailable> for LicenseError {
    fn from(e: FeatureUnavailable) -> Self {
        Self::FeatureUnavailable(e)
    }
}

impl From<ActivationFailure> for LicenseError {
    fn from(e: ActivationFailure) -> Self {
        Self::Activation(e)
    }
}

impl From<ValidationFailure> for LicenseError {
    fn from(e: ValidationFailure) -> Self {
        Self::Validation(e)
    }
}

impl From<serde_json::Error> for LicenseError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("serialization failed: {e}"))
    }
}

// ── Feature unavailable ──────────────────────────────────────────

/// A Pro feature was requested but no usable license covers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureUnavailable {
    pub feature_id: String,
    pub friendly_name: String,
    pub product_name: String,
    pub activate_command: String,
    pub purchase_url: String,
}

impl FeatureUnavailable {
    /// Builds the error with default product wording.
    /// `friendly_name` falls back to the feature id.
    pub fn new(feature_id: impl Into<String>, friendly_name: Option<&str>) -> Self {
        let feature_id = feature_id.into();
        let friendly_name = friendly_name.map_or_else(|| feature_id.clone(), str::to_string);
        Self {
            feature_id,
            friendly_name,
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            activate_command: DEFAULT_ACTIVATE_COMMAND.to_string(),
            purchase_url: DEFAULT_PURCHASE_URL.to_string(),
        }
    }

    /// Builds the error using the wording from `config`.
    pub fn with_config(
        feature_id: impl Into<String>,
        friendly_name: Option<&str>,
        config: &LicenseConfig,
    ) -> Self {
        Self {
            product_name: config.product_name.clone(),
            activate_command: config.activate_command.clone(),
            purchase_url: config.purchase_url.clone(),
            ..Self::new(feature_id, friendly_name)
        }
    }

    #[must_use]
    pub fn with_purchase_url(mut self, url: impl Into<String>) -> Self {
        self.purchase_url = url.into();
        self
    }

    #[must_use]
    pub fn with_activate_command(mut self, command: impl Into<String>) -> Self {
        self.activate_command = command.into();
        self
    }

    fn cli_message(&self) -> String {
        format!(
            "{} requires an active {} license.\n\
             Your data and configurations are preserved.\n\
             \n\
             \x20 Activate: {}\n\
             \x20 Purchase: {}",
            self.friendly_name, self.product_name, self.activate_command, self.purchase_url
        )
    }
}

impl fmt::Display for FeatureUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires an active {} license. Your data and configurations are preserved. \
             Activate with: {}. Purchase at: {}",
            self.friendly_name, self.product_name, self.activate_command, self.purchase_url
        )
    }
}

// ── Activation ───────────────────────────────────────────────────

/// Machine-readable activation failure code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationCode {
    #[default]
    ActivationFailed,
    InvalidKeyFormat,
    NetworkError,
    InvalidKey,
    ExpiredKey,
    SeatLimitExceeded,
    RateLimited,
    ServerError,
}

impl ActivationCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivationFailed => "ACTIVATION_FAILED",
            Self::InvalidKeyFormat => "INVALID_KEY_FORMAT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InvalidKey => "INVALID_KEY",
            Self::ExpiredKey => "EXPIRED_KEY",
            Self::SeatLimitExceeded => "SEAT_LIMIT_EXCEEDED",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError => "SERVER_ERROR",
        }
    }
}

/// Structured context attached to an activation failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Seconds the caller should wait before retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ActivationDetails {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Activation against the license server failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationFailure {
    pub message: String,
    pub code: ActivationCode,
    pub details: ActivationDetails,
}

impl ActivationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: ActivationCode::default(),
            details: ActivationDetails::default(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: ActivationCode) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: ActivationDetails) -> Self {
        self.details = details;
        self
    }

    pub fn invalid_key_format() -> Self {
        // Lowercase placeholder so the hint itself never looks like a key.
        Self::new(
            "Invalid license key format. Expected PRO-xxxx-xxxx-xxxx-xxxx \
             (four groups of 4 uppercase letters or digits).",
        )
        .with_code(ActivationCode::InvalidKeyFormat)
    }

    pub fn network_error(cause: Option<&str>) -> Self {
        Self::new(
            "Unable to reach the license server. Please check your internet connection \
             and try again.",
        )
        .with_code(ActivationCode::NetworkError)
        .with_details(ActivationDetails {
            cause: cause.map(str::to_string),
            ..ActivationDetails::default()
        })
    }

    pub fn invalid_key() -> Self {
        Self::new("This license key is invalid or has been revoked.")
            .with_code(ActivationCode::InvalidKey)
    }

    pub fn expired_key() -> Self {
        Self::new("This license key has expired. Please renew your subscription to continue.")
            .with_code(ActivationCode::ExpiredKey)
    }

    pub fn seat_limit_exceeded(used: u32, max: u32) -> Self {
        Self::new(format!(
            "Seat limit reached ({used}/{max} seats in use). Deactivate another machine \
             or upgrade your plan."
        ))
        .with_code(ActivationCode::SeatLimitExceeded)
        .with_details(ActivationDetails {
            used: Some(used),
            max: Some(max),
            ..ActivationDetails::default()
        })
    }

    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        let message = match retry_after {
            Some(secs) => format!("Too many activation attempts. Please retry in {secs} seconds."),
            None => "Too many activation attempts. Please try again later.".to_string(),
        };
        Self::new(message)
            .with_code(ActivationCode::RateLimited)
            .with_details(ActivationDetails {
                retry_after,
                ..ActivationDetails::default()
            })
    }

    pub fn server_error() -> Self {
        Self::new("Activation failed due to a license server error. Please try again later.")
            .with_code(ActivationCode::ServerError)
    }
}

impl fmt::Display for ActivationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ── Validation ───────────────────────────────────────────────────

/// Machine-readable validation failure code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    #[default]
    ValidationFailed,
    CorruptedCache,
    MachineMismatch,
}

impl ValidationCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::CorruptedCache => "CORRUPTED_CACHE",
            Self::MachineMismatch => "MACHINE_MISMATCH",
        }
    }
}

/// The local license cache exists but cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub message: String,
    pub code: ValidationCode,
    /// Low-level reason, for logs and reports.
    pub cause: Option<String>,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: ValidationCode::default(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: ValidationCode) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn corrupted_cache() -> Self {
        Self::new(
            "The license cache is corrupted or has been tampered with. \
             Please reactivate your license.",
        )
        .with_code(ValidationCode::CorruptedCache)
    }

    pub fn machine_mismatch() -> Self {
        Self::new(
            "The license cache was created on a different machine. \
             Please reactivate your license on this machine.",
        )
        .with_code(ValidationCode::MachineMismatch)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ── Projections ──────────────────────────────────────────────────

/// Machine-readable projection of a [`LicenseError`], for `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ActivationDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl LicenseError {
    /// Short machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::FeatureUnavailable(_) => "FEATURE_UNAVAILABLE",
            Self::Activation(e) => e.code.as_str(),
            Self::Validation(e) => e.code.as_str(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Name of the error kind as shown in reports.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::FeatureUnavailable(_) => "ProFeatureError",
            Self::Activation(_) => "LicenseActivationError",
            Self::Validation(_) => "LicenseValidationError",
            Self::Storage(_) => "LicenseStorageError",
        }
    }

    #[must_use]
    pub fn is_feature_unavailable(&self) -> bool {
        matches!(self, Self::FeatureUnavailable(_))
    }

    /// Multi-line text for terminal output.
    #[must_use]
    pub fn cli_message(&self) -> String {
        match self {
            Self::FeatureUnavailable(e) => e.cli_message(),
            Self::Activation(e) => format!("License activation failed: {}", e.message),
            Self::Validation(e) => format!("License validation failed: {}", e.message),
            Self::Storage(msg) => format!("License storage error: {msg}"),
        }
    }

    /// Structured projection for machine consumers.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        let mut report = ErrorReport {
            error: self.kind_name().to_string(),
            code: self.code().to_string(),
            message: self.to_string(),
            feature_id: None,
            friendly_name: None,
            activate_command: None,
            purchase_url: None,
            details: None,
            cause: None,
        };
        match self {
            Self::FeatureUnavailable(e) => {
                report.feature_id = Some(e.feature_id.clone());
                report.friendly_name = Some(e.friendly_name.clone());
                report.activate_command = Some(e.activate_command.clone());
                report.purchase_url = Some(e.purchase_url.clone());
            }
            Self::Activation(e) => {
                report.details = (!e.details.is_empty()).then(|| e.details.clone());
            }
            Self::Validation(e) => report.cause = e.cause.clone(),
            Self::Storage(_) => {}
        }
        report
    }
}
