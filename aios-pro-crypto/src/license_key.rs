//! License key format checks and display masking.
//!
//! Keys look like `PRO-XXXX-XXXX-XXXX-XXXX`. Only the prefix, the first and
//! the last group are ever shown; the two interior groups never leave this
//! module unmasked.

/// Required prefix of a license key.
pub const KEY_PREFIX: &str = "PRO";

/// Placeholder shown when there is no displayable key.
pub const FULLY_MASKED: &str = "****-****-****-****";

const SHORT_MASK: &str = "****";
const GROUP_LEN: usize = 4;

/// Returns true only for `PRO-XXXX-XXXX-XXXX-XXXX` where every `X` is an
/// uppercase ASCII letter or digit.
pub fn validate_key_format(key: Option<&str>) -> bool {
    let Some(key) = key else {
        return false;
    };
    let mut parts = key.split('-');
    if parts.next() != Some(KEY_PREFIX) {
        return false;
    }
    let groups: Vec<&str> = parts.collect();
    groups.len() == 4
        && groups.iter().all(|g| {
            g.len() == GROUP_LEN
                && g.bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        })
}

/// Masks a key for display.
///
/// - `PREFIX-AAAA-BBBB-CCCC-DDDD` → `PREFIX-AAAA-****-****-DDDD`
/// - other strings longer than 8 chars → `AAAA-****-****-DDDD` (first/last 4)
/// - shorter strings → `****`
/// - `None` → `****-****-****-****`
pub fn mask_key(key: Option<&str>) -> String {
    let Some(key) = key else {
        return FULLY_MASKED.to_string();
    };

    let parts: Vec<&str> = key.split('-').collect();
    if parts.len() == 5
        && !parts[0].is_empty()
        && parts[1..].iter().all(|p| p.chars().count() == GROUP_LEN)
    {
        return format!("{}-{}-****-****-{}", parts[0], parts[1], parts[4]);
    }

    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 2 * GROUP_LEN {
        return SHORT_MASK.to_string();
    }
    let head: String = chars[..GROUP_LEN].iter().collect();
    let tail: String = chars[chars.len() - GROUP_LEN..].iter().collect();
    format!("{head}-****-****-{tail}")
}
