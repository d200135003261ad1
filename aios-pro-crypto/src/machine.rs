//! Machine fingerprinting for cache binding.
//!
//! The fingerprint is a SHA-256 digest over identifiers that survive reboots
//! and upgrades: OS, architecture, host name, the platform machine id and a
//! per-installation nonce kept under the user's local data directory. It is
//! recomputed on demand and never written anywhere.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const NONCE_DIR: &str = "aios";
const NONCE_FILE: &str = "installation-id";

/// The raw inputs to the machine fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineProfile {
    /// Operating system name.
    pub os_name: String,
    /// CPU architecture.
    pub arch: String,
    /// Hostname.
    pub hostname: String,
    /// Platform machine id, when the OS exposes one.
    pub machine_id: Option<String>,
    /// Random id created once per installation, when it could be stored.
    pub installation_nonce: Option<String>,
}

impl MachineProfile {
    /// Collects the profile of the current machine.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os_name: env::consts::OS.to_string(),
            arch: env::consts::ARCH.to_string(),
            hostname: get_hostname(),
            machine_id: get_machine_id(),
            installation_nonce: installation_nonce(),
        }
    }

    /// Returns the 64-char hex fingerprint of this profile.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut components = vec![
            self.os_name.as_str(),
            self.arch.as_str(),
            self.hostname.as_str(),
        ];
        if let Some(id) = &self.machine_id {
            components.push(id);
        }
        if let Some(nonce) = &self.installation_nonce {
            components.push(nonce);
        }

        let mut hasher = Sha256::new();
        hasher.update(components.join("|").as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Returns the fingerprint of the current machine (64 lowercase hex chars).
#[must_use]
pub fn machine_identity() -> String {
    MachineProfile::collect().fingerprint()
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets the machine ID (platform-specific unique identifier).
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        fs::read_to_string("/etc/machine-id")
            .or_else(|_| fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Reads the installation nonce once per process, creating it on first use.
fn installation_nonce() -> Option<String> {
    static NONCE: OnceLock<Option<String>> = OnceLock::new();
    NONCE
        .get_or_init(|| {
            let path = nonce_path()?;
            match load_or_create_nonce(&path) {
                Ok(nonce) => Some(nonce),
                Err(e) => {
                    debug!("installation nonce unavailable at {:?}: {}", path, e);
                    None
                }
            }
        })
        .clone()
}

fn nonce_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(NONCE_DIR).join(NONCE_FILE))
}

/// Returns the nonce stored at `path`, creating a new UUID there if absent.
/// Concurrent first runs race on `create_new`; the loser reads the winner's.
pub(crate) fn load_or_create_nonce(path: &Path) -> std::io::Result<String> {
    match fs::read_to_string(path) {
        Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let nonce = uuid::Uuid::new_v4().to_string();
    match OpenOptions::new().create_new(true).write(true).open(path) {
        Ok(mut file) => {
            file.write_all(nonce.as_bytes())?;
            file.flush()?;
            Ok(nonce)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Ok(fs::read_to_string(path)?.trim().to_string())
        }
        Err(e) => Err(e),
    }
}
