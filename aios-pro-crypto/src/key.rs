//! Key derivation and management.
//!
//! Cache keys are derived from the machine identity with PBKDF2-HMAC-SHA256.
//! The derivation is deliberately slow; callers cache the result of a load,
//! never the key.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Default size of a salt in bytes.
pub const SALT_SIZE: usize = 16;

/// PBKDF2 rounds used for cache key derivation.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// A derived encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a slice, rejecting anything that is not 256 bits.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Creates a key from its hex encoding.
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let mut raw = hex::decode(encoded).map_err(|source| CryptoError::InvalidHex {
            field: "key",
            source,
        })?;
        let key = Self::from_slice(&raw);
        raw.zeroize();
        key
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Salt for key derivation. A fresh one is generated for every cache write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt {
    bytes: Vec<u8>,
}

impl Salt {
    /// Generates a random salt of [`SALT_SIZE`] bytes.
    pub fn random() -> Self {
        generate_salt(SALT_SIZE)
    }

    /// Creates a salt from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Decodes a hex-encoded salt.
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        hex::decode(encoded)
            .map(Self::from_bytes)
            .map_err(|source| CryptoError::InvalidHex {
                field: "salt",
                source,
            })
    }

    /// Returns the salt as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Returns the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the salt length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-length salt.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Generates `length` cryptographically random salt bytes.
pub fn generate_salt(length: usize) -> Salt {
    let mut bytes = vec![0u8; length];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Salt { bytes }
}

/// Derives a cache key from a machine identity and salt.
///
/// Deterministic for fixed inputs; changing either input changes the key.
pub fn derive_key(machine_id: &str, salt: &Salt) -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        machine_id.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut bytes,
    );
    DerivedKey::from_bytes(bytes)
}

/// Generates a random encryption key (not machine-derived).
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}
