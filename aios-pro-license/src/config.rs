//! Presentation and storage settings, read from an optional `license.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_PRODUCT_NAME: &str = "AIOS Pro";
pub const DEFAULT_ACTIVATE_COMMAND: &str = "aios pro activate --key <KEY>";
pub const DEFAULT_VALIDATE_COMMAND: &str = "aios pro validate";
pub const DEFAULT_PURCHASE_URL: &str = "https://synkra.ai/pro";
pub const DEFAULT_CACHE_DIR_NAME: &str = ".aios";
pub const DEFAULT_CACHE_FILE_NAME: &str = "license.cache";

/// Licensing settings. Every field is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseConfig {
    #[serde(default = "default_product_name")]
    pub product_name: String,
    #[serde(default = "default_activate_command")]
    pub activate_command: String,
    #[serde(default = "default_validate_command")]
    pub validate_command: String,
    #[serde(default = "default_purchase_url")]
    pub purchase_url: String,
    /// Directory, relative to the project root, holding the cache files.
    #[serde(default = "default_cache_dir_name")]
    pub cache_dir_name: String,
    #[serde(default = "default_cache_file_name")]
    pub cache_file_name: String,
}

fn default_product_name() -> String {
    DEFAULT_PRODUCT_NAME.to_string()
}

fn default_activate_command() -> String {
    DEFAULT_ACTIVATE_COMMAND.to_string()
}

fn default_validate_command() -> String {
    DEFAULT_VALIDATE_COMMAND.to_string()
}

fn default_purchase_url() -> String {
    DEFAULT_PURCHASE_URL.to_string()
}

fn default_cache_dir_name() -> String {
    DEFAULT_CACHE_DIR_NAME.to_string()
}

fn default_cache_file_name() -> String {
    DEFAULT_CACHE_FILE_NAME.to_string()
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            activate_command: default_activate_command(),
            validate_command: default_validate_command(),
            purchase_url: default_purchase_url(),
            cache_dir_name: default_cache_dir_name(),
            cache_file_name: default_cache_file_name(),
        }
    }
}

impl LicenseConfig {
    /// Parses a TOML document. Unknown keys are ignored.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Loads settings from `path`.
    /// Falls back to the defaults when the file is missing or malformed.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No license config at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded license config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse license config {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read license config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
