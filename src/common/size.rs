//! Human-readable sizes and names

use super::error::{ProxyError, Result};

const UNITS: [&str; 9] = ["B", "K", "M", "G", "T", "P", "E", "Z", "Y"];

/// Upper-case the first character of `s`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format a byte count with a single-letter binary unit, rounding down
///
/// `human_size(512 * 1024 * 1024)` is `"512M"`.
pub fn human_size(mut size: i64) -> String {
    let mut i = 0;
    while size >= 1024 && i < UNITS.len() - 1 {
        size /= 1024;
        i += 1;
    }
    format!("{}{}", size, UNITS[i])
}

/// Parse an amount of RAM such as `512M`, `1g` or `2048kb` into bytes
///
/// Units are case-insensitive and the trailing `b` is optional. A bare
/// number is taken as bytes.
pub fn ram_in_bytes(size: &str) -> Result<i64> {
    let invalid = || ProxyError::Other(format!("Invalid size: '{}'", size));

    let mut rest = size;
    if rest.ends_with(['b', 'B']) {
        rest = &rest[..rest.len() - 1];
    }

    let multiplier: i64 = match rest.chars().last() {
        Some('k' | 'K') => 1024,
        Some('m' | 'M') => 1024 * 1024,
        Some('g' | 'G') => 1024 * 1024 * 1024,
        _ => 1,
    };
    if multiplier != 1 {
        rest = &rest[..rest.len() - 1];
    }

    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    rest.parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}
