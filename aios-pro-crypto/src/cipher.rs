//! Payload encryption using AES-256-GCM.
//!
//! Provides authenticated encryption: the tag covers the ciphertext and the
//! IV, so altering either (or decrypting with another machine's key) fails.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Size of the IV in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Encrypted data with everything needed for decryption except the key.
/// All fields are lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// The ciphertext without the tag.
    pub ciphertext: String,
    /// The IV used for this encryption (unique per call).
    pub iv: String,
    /// The GCM authentication tag.
    pub tag: String,
}

impl EncryptedPayload {
    fn decode(&self) -> CryptoResult<(Vec<u8>, [u8; IV_SIZE])> {
        let mut sealed = decode_field("ciphertext", &self.ciphertext)?;
        let iv = decode_field("iv", &self.iv)?;
        let tag = decode_field("tag", &self.tag)?;

        let iv: [u8; IV_SIZE] = iv
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidIvLength {
                expected: IV_SIZE,
                actual: iv.len(),
            })?;
        if tag.len() != TAG_SIZE {
            return Err(CryptoError::Decryption(format!(
                "tag must be {TAG_SIZE} bytes, got {}",
                tag.len()
            )));
        }

        sealed.extend_from_slice(&tag);
        Ok((sealed, iv))
    }
}

fn decode_field(field: &'static str, value: &str) -> CryptoResult<Vec<u8>> {
    hex::decode(value).map_err(|source| CryptoError::InvalidHex { field, source })
}

/// Encrypts plaintext with AES-256-GCM under a fresh random IV.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<EncryptedPayload> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    // aes-gcm appends the tag to the ciphertext
    let tag = sealed.split_off(sealed.len() - TAG_SIZE);

    Ok(EncryptedPayload {
        ciphertext: hex::encode(sealed),
        iv: hex::encode(iv),
        tag: hex::encode(tag),
    })
}

/// Decrypts a payload. Fails on a wrong key or any altered field.
pub fn decrypt(key: &DerivedKey, payload: &EncryptedPayload) -> CryptoResult<Vec<u8>> {
    let (sealed, iv) = payload.decode()?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_ref())
        .map_err(|_| {
            CryptoError::Decryption("authentication failed (wrong key or tampered data)".to_string())
        })
}

/// Encrypts a string.
pub fn encrypt_string(key: &DerivedKey, plaintext: &str) -> CryptoResult<EncryptedPayload> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypts a payload back into a string.
pub fn decrypt_string(key: &DerivedKey, payload: &EncryptedPayload) -> CryptoResult<String> {
    let plaintext = decrypt(key, payload)?;
    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
}

/// Serializes `value` as JSON and encrypts it.
pub fn encrypt_json<T: Serialize + ?Sized>(
    key: &DerivedKey,
    value: &T,
) -> CryptoResult<EncryptedPayload> {
    let json = serde_json::to_vec(value)?;
    encrypt(key, &json)
}

/// Decrypts a payload and parses the plaintext as JSON.
pub fn decrypt_json<T: DeserializeOwned>(
    key: &DerivedKey,
    payload: &EncryptedPayload,
) -> CryptoResult<T> {
    let plaintext = decrypt(key, payload)?;
    Ok(serde_json::from_slice(&plaintext)?)
}
