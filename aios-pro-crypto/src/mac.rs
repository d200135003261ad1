//! Integrity hashing: keyed HMAC-SHA256 and a plain SHA-256 checksum.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Size of an HMAC-SHA256 digest in bytes.
pub const HMAC_SIZE: usize = 32;

fn keyed(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key size")
}

/// Computes HMAC-SHA256 over `data`, returned as 64 lowercase hex chars.
pub fn compute_hmac(data: &[u8], key: &[u8]) -> String {
    let mut mac = keyed(key);
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks `hmac` against `data` in constant time.
///
/// Returns `false` for malformed hex or a digest of the wrong length; this
/// never errors so it can sit inside boolean checks.
pub fn verify_hmac(data: &[u8], key: &[u8], hmac: &str) -> bool {
    let Ok(expected) = hex::decode(hmac) else {
        return false;
    };
    if expected.len() != HMAC_SIZE {
        return false;
    }
    let mut mac = keyed(key);
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

/// Unkeyed SHA-256 of `data` as 64 lowercase hex chars.
pub fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
