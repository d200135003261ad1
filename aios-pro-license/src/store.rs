//! Machine-bound, encrypted license cache on disk.
//!
//! Each file is a JSON envelope:
//!
//! ```json
//! {"version":1,"salt":"..","binding":"..","ciphertext":"..","iv":"..","tag":"..","hmac":"..","checksum":".."}
//! ```
//!
//! - `checksum` is SHA-256 over every other field. It is checked first, so an
//!   edited envelope is reported as corrupted rather than foreign.
//! - `binding` is HMAC-SHA256 of the machine identity keyed by the salt, so a
//!   cache from another machine is recognised without decrypting it.
//! - `hmac` is HMAC-SHA256 of `ciphertext ‖ iv ‖ tag` under the derived key.
//! - The plaintext is `{"version","machineId","record"}`.
//!
//! Read failures are never reported as "not activated": a file that exists
//! but cannot be opened is a [`ValidationFailure`].

use crate::config::LicenseConfig;
use crate::error::{LicenseError, LicenseResult, ValidationFailure};
use crate::record::{LicenseRecord, PendingDeactivation};
use aios_pro_crypto::{
    checksum, compute_hmac, decrypt_json, derive_key, encrypt_json, machine_identity,
    verify_hmac, EncryptedPayload, Salt,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Envelope format version written by this store.
pub const CACHE_VERSION: u32 = 1;

/// File name of the offline deactivation marker, next to the cache.
pub const PENDING_DEACTIVATION_FILE: &str = "pending-deactivation.json";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    salt: String,
    binding: String,
    ciphertext: String,
    iv: String,
    tag: String,
    hmac: String,
    checksum: String,
}

impl Envelope {
    fn digest(&self) -> String {
        let fields = [
            self.version.to_string().as_str(),
            self.salt.as_str(),
            self.binding.as_str(),
            self.ciphertext.as_str(),
            self.iv.as_str(),
            self.tag.as_str(),
            self.hmac.as_str(),
        ]
        .join(".");
        checksum(fields.as_bytes())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sealed<M, T> {
    version: u32,
    machine_id: M,
    record: T,
}

fn mac_input(ciphertext: &str, iv: &str, tag: &str) -> String {
    format!("{ciphertext}{iv}{tag}")
}

fn corrupted(cause: impl Into<String>) -> LicenseError {
    ValidationFailure::corrupted_cache().with_cause(cause).into()
}

/// Reads and writes the license cache for one project directory.
#[derive(Debug, Clone)]
pub struct LicenseCacheStore {
    dir: PathBuf,
    file_name: String,
    machine_id: String,
}

impl LicenseCacheStore {
    /// Store for `<target_dir>/.aios/license.cache`, bound to this machine.
    pub fn new(target_dir: impl AsRef<Path>) -> Self {
        Self::with_config(target_dir, &LicenseConfig::default())
    }

    /// Store using the directory and file names from `config`.
    pub fn with_config(target_dir: impl AsRef<Path>, config: &LicenseConfig) -> Self {
        Self {
            dir: target_dir.as_ref().join(&config.cache_dir_name),
            file_name: config.cache_file_name.clone(),
            machine_id: machine_identity(),
        }
    }

    /// Replaces the machine identity the cache is bound to.
    #[must_use]
    pub fn with_machine_id(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = machine_id.into();
        self
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    #[must_use]
    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.cache_path().is_file()
    }

    /// Encrypts and writes `record`, replacing any existing cache.
    pub fn write(&self, record: &LicenseRecord) -> LicenseResult<()> {
        let path = self.cache_path();
        self.write_sealed(&path, record)?;
        debug!("Wrote license cache to {:?}", path);
        Ok(())
    }

    /// Reads the cache. `Ok(None)` when no cache file exists.
    pub fn read(&self) -> LicenseResult<Option<LicenseRecord>> {
        let path = self.cache_path();
        let record = self.read_sealed(&path)?;
        if record.is_some() {
            debug!("Read license cache from {:?}", path);
        }
        Ok(record)
    }

    /// Removes the cache file. Succeeds when it is already gone.
    pub fn delete(&self) -> LicenseResult<()> {
        remove_if_present(&self.cache_path())
    }

    // ── Pending deactivation ─────────────────────────────────────

    #[must_use]
    pub fn pending_deactivation_path(&self) -> PathBuf {
        self.dir.join(PENDING_DEACTIVATION_FILE)
    }

    /// Records that `license_key` was deactivated on this machine while
    /// offline.
    pub fn set_pending_deactivation(&self, license_key: &str) -> LicenseResult<()> {
        let pending = PendingDeactivation {
            license_key: license_key.to_string(),
            machine_id: self.machine_id.clone(),
            deactivated_at: Utc::now(),
            synced: false,
            synced_at: None,
        };
        let path = self.pending_deactivation_path();
        self.write_sealed(&path, &pending)?;
        debug!("Recorded pending deactivation at {:?}", path);
        Ok(())
    }

    /// The pending deactivation, if one exists and has not been synced yet.
    pub fn pending_deactivation(&self) -> LicenseResult<Option<PendingDeactivation>> {
        let pending: Option<PendingDeactivation> =
            self.read_sealed(&self.pending_deactivation_path())?;
        Ok(pending.filter(|p| !p.synced))
    }

    /// Marks the pending deactivation as reported to the server.
    /// Does nothing when none is recorded.
    pub fn mark_pending_deactivation_synced(&self) -> LicenseResult<()> {
        let path = self.pending_deactivation_path();
        let Some(mut pending) = self.read_sealed::<PendingDeactivation>(&path)? else {
            return Ok(());
        };
        pending.synced = true;
        pending.synced_at = Some(Utc::now());
        self.write_sealed(&path, &pending)
    }

    pub fn clear_pending_deactivation(&self) -> LicenseResult<()> {
        remove_if_present(&self.pending_deactivation_path())
    }

    // ── Envelope ─────────────────────────────────────────────────

    fn seal<T: Serialize>(&self, record: &T) -> LicenseResult<Envelope> {
        let salt = Salt::random();
        let key = derive_key(&self.machine_id, &salt);
        let sealed = Sealed {
            version: CACHE_VERSION,
            machine_id: self.machine_id.as_str(),
            record,
        };
        let payload = encrypt_json(&key, &sealed)
            .map_err(|e| LicenseError::Storage(format!("failed to encrypt cache: {e}")))?;

        let mut envelope = Envelope {
            version: CACHE_VERSION,
            salt: salt.to_hex(),
            binding: compute_hmac(self.machine_id.as_bytes(), salt.as_bytes()),
            hmac: compute_hmac(
                mac_input(&payload.ciphertext, &payload.iv, &payload.tag).as_bytes(),
                key.as_bytes(),
            ),
            ciphertext: payload.ciphertext,
            iv: payload.iv,
            tag: payload.tag,
            checksum: String::new(),
        };
        envelope.checksum = envelope.digest();
        Ok(envelope)
    }

    fn open<T: DeserializeOwned>(&self, envelope: Envelope) -> LicenseResult<T> {
        if envelope.version != CACHE_VERSION {
            return Err(corrupted(format!(
                "unsupported cache version {}",
                envelope.version
            )));
        }
        if envelope.digest() != envelope.checksum {
            return Err(corrupted("envelope checksum mismatch"));
        }

        let salt = Salt::from_hex(&envelope.salt).map_err(|e| corrupted(e.to_string()))?;
        if salt.is_empty() {
            return Err(corrupted("empty salt"));
        }
        if !verify_hmac(self.machine_id.as_bytes(), salt.as_bytes(), &envelope.binding) {
            return Err(ValidationFailure::machine_mismatch().into());
        }

        let key = derive_key(&self.machine_id, &salt);
        let mac_data = mac_input(&envelope.ciphertext, &envelope.iv, &envelope.tag);
        if !verify_hmac(mac_data.as_bytes(), key.as_bytes(), &envelope.hmac) {
            return Err(corrupted("integrity check failed"));
        }

        let payload = EncryptedPayload {
            ciphertext: envelope.ciphertext,
            iv: envelope.iv,
            tag: envelope.tag,
        };
        let sealed: Sealed<String, T> =
            decrypt_json(&key, &payload).map_err(|e| corrupted(e.to_string()))?;

        if sealed.version != CACHE_VERSION {
            return Err(corrupted(format!(
                "unsupported record version {}",
                sealed.version
            )));
        }
        if sealed.machine_id != self.machine_id {
            return Err(ValidationFailure::machine_mismatch().into());
        }
        Ok(sealed.record)
    }

    fn write_sealed<T: Serialize>(&self, path: &Path, record: &T) -> LicenseResult<()> {
        let envelope = self.seal(record)?;
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::create_dir_all(&self.dir).map_err(|e| {
            LicenseError::Storage(format!("failed to create {:?}: {e}", self.dir))
        })?;
        atomic_write(path, &bytes)
            .map_err(|e| LicenseError::Storage(format!("failed to write {path:?}: {e}")))
    }

    fn read_sealed<T: DeserializeOwned>(&self, path: &Path) -> LicenseResult<Option<T>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(corrupted(format!("unreadable cache file: {e}"))),
        };
        let envelope: Envelope = serde_json::from_str(&contents)
            .map_err(|e| corrupted(format!("malformed cache file: {e}")))?;
        self.open(envelope).map(Some)
    }
}

fn remove_if_present(path: &Path) -> LicenseResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LicenseError::Storage(format!(
            "failed to remove {path:?}: {e}"
        ))),
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");
    let _ = fs::remove_file(&tmp);
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
