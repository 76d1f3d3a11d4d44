//! Session checksum - tamper stamp over the stored session fields.
//!
//! A 31-multiplier rolling hash over UTF-16 code units in wrapping 32-bit
//! arithmetic, rendered as the absolute value in base 36. This matches the
//! stamp the site has always written, so existing tabs keep validating.
//! It is not a MAC: anyone with the salt (shipped with the page) can forge it.

use crate::access::AccessTier;

/// Salt mixed into every checksum
pub const DEFAULT_SALT: &str = "purge_secret_2025";

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Checksum for a session record
pub fn session_checksum(key: &str, tier: AccessTier, issued_at_ms: i64, salt: &str) -> String {
    let data = format!("{}_{}_{}_{}", key, tier.as_str(), issued_at_ms, salt);
    to_base36(rolling_hash(&data).unsigned_abs() as u64)
}

/// `h = h * 31 + unit`, wrapping at 32 bits
pub fn rolling_hash(data: &str) -> i32 {
    data.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
