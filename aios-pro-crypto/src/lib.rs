//! Crypto primitives for AIOS Pro licensing.
//!
//! Everything here is stateless apart from the installation nonce that feeds
//! the machine fingerprint:
//! - Machine fingerprinting ([`machine_identity`])
//! - PBKDF2 key derivation from `(machine identity, salt)` ([`derive_key`])
//! - AES-256-GCM payload encryption with hex-encoded fields ([`encrypt`])
//! - HMAC-SHA256 integrity tags ([`compute_hmac`], [`verify_hmac`])
//! - License key masking and format validation ([`mask_key`])
//!
//! # Machine binding
//!
//! A cache encrypted under `derive_key(machine_identity(), salt)` cannot be
//! opened on another machine: the other machine derives a different key and
//! the GCM tag check fails.

mod cipher;
mod error;
mod key;
mod license_key;
mod mac;
mod machine;

pub use cipher::{
    decrypt, decrypt_json, decrypt_string, encrypt, encrypt_json, encrypt_string,
    EncryptedPayload, IV_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, generate_random_key, generate_salt, DerivedKey, Salt, KEY_SIZE,
    PBKDF2_ITERATIONS, SALT_SIZE,
};
pub use license_key::{mask_key, validate_key_format, FULLY_MASKED, KEY_PREFIX};
pub use mac::{checksum, compute_hmac, verify_hmac, HMAC_SIZE};
pub use machine::{machine_identity, MachineProfile};
